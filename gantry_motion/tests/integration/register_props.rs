//! Intent register properties under arbitrary command sequences.

use gantry_common::hal::types::{Axis, Direction};
use gantry_common::motion::command::{MotionCommand, MotionIntent};
use gantry_motion::intent::IntentRegister;
use proptest::prelude::*;

fn axis() -> impl Strategy<Value = Axis> {
    prop_oneof![Just(Axis::X), Just(Axis::Y)]
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Forward), Just(Direction::Backward)]
}

fn command() -> impl Strategy<Value = MotionCommand> {
    prop_oneof![
        (axis(), direction()).prop_map(|(a, d)| MotionCommand::StepOnce(a, d)),
        (axis(), direction()).prop_map(|(a, d)| MotionCommand::ToggleContinuous(a, d)),
        (axis(), direction()).prop_map(|(a, d)| MotionCommand::SetContinuous(a, d)),
        (axis(), direction(), 0u64..200).prop_map(|(a, d, n)| MotionCommand::Travel(a, d, n)),
        axis().prop_map(MotionCommand::StopAxis),
        Just(MotionCommand::StopAll),
    ]
}

/// Reference semantics: the latest command on an axis decides its intent.
fn model_apply(model: &mut [MotionIntent; 2], command: MotionCommand) {
    match command {
        MotionCommand::StepOnce(a, d) => model[a.index()] = MotionIntent::StepOnce(d),
        MotionCommand::ToggleContinuous(a, d) => {
            model[a.index()] = if model[a.index()] == MotionIntent::Continuous(d) {
                MotionIntent::Idle
            } else {
                MotionIntent::Continuous(d)
            };
        }
        MotionCommand::SetContinuous(a, d) => model[a.index()] = MotionIntent::Continuous(d),
        MotionCommand::Travel(a, _, 0) => model[a.index()] = MotionIntent::Idle,
        MotionCommand::Travel(a, direction, remaining) => {
            model[a.index()] = MotionIntent::Travel {
                direction,
                remaining,
            }
        }
        MotionCommand::StopAxis(a) => model[a.index()] = MotionIntent::Idle,
        MotionCommand::StopAll => *model = [MotionIntent::Idle; 2],
    }
}

proptest! {
    #[test]
    fn register_follows_latest_command(commands in proptest::collection::vec(command(), 0..64)) {
        let register = IntentRegister::new();
        let mut model = [MotionIntent::Idle; 2];
        for command in commands {
            register.apply(command);
            model_apply(&mut model, command);
            for axis in Axis::ALL {
                let intent = register.intent(axis);
                prop_assert_eq!(intent, model[axis.index()]);
                // Never both continuous directions at once.
                prop_assert!(
                    !(intent.is_continuous(Direction::Forward)
                        && intent.is_continuous(Direction::Backward))
                );
            }
        }
    }

    #[test]
    fn stop_all_always_clears(commands in proptest::collection::vec(command(), 0..64)) {
        let register = IntentRegister::new();
        for command in commands {
            register.apply(command);
        }
        register.apply(MotionCommand::StopAll);
        prop_assert!(!register.snapshot().has_work());
    }

    #[test]
    fn stale_settle_never_overwrites(
        first in command(),
        second in command(),
        executed in 0u64..50,
    ) {
        let register = IntentRegister::new();
        register.apply(first);
        let snapshot = register.snapshot();
        register.apply(second);
        let before = register.snapshot();

        for axis in Axis::ALL {
            if before.revision(axis) != snapshot.revision(axis) {
                prop_assert!(!register.settle(axis, snapshot.revision(axis), executed));
                prop_assert_eq!(register.intent(axis), before.intent(axis));
            }
        }
    }
}
