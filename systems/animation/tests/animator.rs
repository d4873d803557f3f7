use lionengine_core::AnimState;
use lionengine_system_animation::{Animation, AnimationError, Animator};

fn animation(first: u32, last: u32, speed: f64, reverse: bool, repeat: bool) -> Animation {
    Animation::new(first, last, speed, reverse, repeat).expect("valid animation")
}

fn play(animation: &Animation) -> Animator {
    let mut animator = Animator::new();
    animator.play(animation);
    animator
}

#[test]
fn forward_playback_never_decreases_and_finishes_on_last_frame() {
    for speed in [0.1, 0.3, 0.7, 1.0, 2.5] {
        let mut animator = play(&animation(2, 9, speed, false, false));
        let mut previous = animator.frame();

        for _ in 0..200 {
            animator.update(1.0);
            let frame = animator.frame();
            assert!(frame >= previous, "frame went back at speed {speed}");
            assert!((2..=9).contains(&frame), "frame {frame} out of bounds");
            previous = frame;
        }

        assert_eq!(animator.anim_state(), AnimState::Finished);
        assert_eq!(animator.frame(), 9);
    }
}

#[test]
fn reverse_playback_walks_back_to_first_frame() {
    let mut animator = play(&animation(1, 5, 1.0, true, false));
    let mut rising = Vec::new();
    let mut falling = Vec::new();

    for _ in 0..20 {
        animator.update(1.0);
        match animator.anim_state() {
            AnimState::Playing => rising.push(animator.frame()),
            AnimState::Reversing => falling.push(animator.frame()),
            _ => break,
        }
    }

    assert_eq!(rising, vec![2, 3, 4, 5]);
    assert!(
        falling.windows(2).all(|pair| pair[1] < pair[0]),
        "reversing frames must strictly decrease: {falling:?}"
    );
    assert_eq!(falling.first(), Some(&5));
    assert_eq!(animator.anim_state(), AnimState::Finished);
    assert_eq!(animator.frame(), 1);
}

#[test]
fn repeated_animation_cycles_through_frames() {
    let mut animator = play(&animation(1, 3, 1.0, false, true));
    let mut frames = vec![animator.frame()];
    for _ in 0..8 {
        animator.update(1.0);
        frames.push(animator.frame());
    }

    assert_eq!(frames, vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
    assert_eq!(animator.anim_state(), AnimState::Playing);
}

#[test]
fn reversed_repeated_animation_bounces_between_ends() {
    let mut animator = play(&animation(1, 3, 1.0, true, true));
    let mut frames = Vec::new();
    for _ in 0..10 {
        animator.update(1.0);
        frames.push(animator.frame());
    }

    assert_eq!(frames, vec![2, 3, 3, 2, 1, 2, 3, 3, 2, 1]);
    assert_eq!(animator.anim_state(), AnimState::Reversing);
}

#[test]
fn set_frame_bypasses_bounds_and_state() {
    let mut animator = play(&animation(4, 6, 1.0, false, false));
    animator.set_frame(20).expect("frame above minimum");
    assert_eq!(animator.frame(), 20);
    assert_eq!(animator.anim_state(), AnimState::Playing);

    animator.update(1.0);
    assert_eq!(animator.anim_state(), AnimState::Finished);
    assert_eq!(animator.frame(), 6);

    animator.set_frame(2).expect("frame above minimum");
    assert_eq!(animator.frame(), 2);
    assert_eq!(animator.anim_state(), AnimState::Finished);
    assert_eq!(animator.set_frame(0), Err(AnimationError::FrameBelowMinimum(0)));
}

#[test]
fn quarter_speed_loop_takes_twenty_four_ticks() {
    let mut animator = play(&animation(4, 6, 0.125, false, true));

    for _ in 0..23 {
        animator.update(1.0);
    }
    assert_eq!(animator.frame(), 6);
    assert_eq!(animator.frame_anim(), 3);

    animator.update(1.0);
    assert_eq!(animator.frame(), 4);
    assert_eq!(animator.frame_anim(), 1);
    assert_eq!(animator.anim_state(), AnimState::Playing);
}

#[test]
fn extrapolation_scales_the_step() {
    let mut halved = play(&animation(1, 10, 1.0, false, false));
    let mut full = play(&animation(1, 10, 1.0, false, false));

    for _ in 0..6 {
        halved.update(0.5);
    }
    for _ in 0..3 {
        full.update(1.0);
    }

    assert_eq!(halved.frame(), full.frame());
}

#[test]
fn animations_load_from_toml() {
    #[derive(serde::Deserialize)]
    struct Definitions {
        walk: Animation,
    }

    let definitions: Definitions = toml::from_str(
        r#"
        walk = { first = 4, last = 6, speed = 0.125, repeat = true }
        "#,
    )
    .expect("valid definitions");
    assert_eq!(definitions.walk, animation(4, 6, 0.125, false, true));

    let invalid = toml::from_str::<Definitions>("walk = { first = 6, last = 4, speed = 1.0 }");
    assert!(invalid.is_err());
}
