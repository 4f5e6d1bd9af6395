// Cadence - Simulation Driver Toolkit
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[cfg(test)]
mod integration_tests {
    use crate::backends::{DryRun, RandomWalk};
    use crate::metrics::RunMetrics;
    use crate::trajectory::{JsonlTrajectory, Trajectory, TrajectoryWriter};
    use crate::{
        Backend, CallbackOptions, Checkpoint, DriverConfig, DriverError, Increment, RunObserver,
        Simulation, System,
    };
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Log = Rc<RefCell<Vec<(&'static str, u64)>>>;

    #[derive(Debug, PartialEq, thiserror::Error)]
    #[error("counter exploded on advance call {call}")]
    struct Boom {
        call: u64,
    }

    /// Backend whose system is the number of steps advanced so far.
    #[derive(Debug, Default)]
    struct Counter {
        value: u64,
        calls: Vec<u64>,
        fail_on_call: Option<u64>,
    }

    impl Counter {
        fn failing_on(call: u64) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::default()
            }
        }
    }

    impl Backend for Counter {
        type System = u64;
        type Error = Boom;

        fn name(&self) -> &str {
            "counter"
        }

        fn system(&self) -> &u64 {
            &self.value
        }

        fn system_mut(&mut self) -> &mut u64 {
            &mut self.value
        }

        fn advance(&mut self, steps: u64) -> Result<(), Boom> {
            let call = self.calls.len() as u64 + 1;
            if self.fail_on_call == Some(call) {
                self.fail_on_call = None;
                return Err(Boom { call });
            }
            self.calls.push(steps);
            self.value += steps;
            Ok(())
        }

        fn snapshot(&self) -> serde_json::Value {
            serde_json::json!({ "value": self.value })
        }

        fn restore(&mut self, state: serde_json::Value) -> Result<(), Boom> {
            self.value = state
                .get("value")
                .and_then(serde_json::Value::as_u64)
                .ok_or(Boom { call: 0 })?;
            Ok(())
        }
    }

    fn recorder<B: Backend>(
        log: &Log,
        label: &'static str,
    ) -> impl FnMut(&Simulation<B>) -> anyhow::Result<()> + 'static {
        let log = Rc::clone(log);
        move |sim: &Simulation<B>| {
            log.borrow_mut().push((label, sim.current_step()));
            Ok(())
        }
    }

    fn fired(log: &Log, label: &str) -> Vec<u64> {
        log.borrow()
            .iter()
            .filter(|(l, _)| *l == label)
            .map(|(_, step)| *step)
            .collect()
    }

    fn single_step() -> DriverConfig {
        DriverConfig {
            increment: Increment::Single,
            ..DriverConfig::default()
        }
    }

    #[derive(Debug, Default)]
    struct StopRecorder {
        stops: Mutex<Vec<u64>>,
    }

    impl RunObserver for StopRecorder {
        fn on_run_stop(&self, step: u64, _elapsed: Duration) {
            self.stops.lock().unwrap().push(step);
        }
    }

    #[test]
    fn test_split_runs_match_single_run() {
        for increment in [Increment::Single, Increment::Auto, Increment::Checkpoint] {
            let config = DriverConfig {
                increment,
                ..DriverConfig::default()
            };
            let log: Log = Rc::default();

            let mut split = Simulation::with_config(Counter::default(), config.clone());
            split.add(recorder(&log, "split"), 7).unwrap();
            split.run(17).unwrap();
            split.run(25).unwrap();

            let mut whole = Simulation::with_config(Counter::default(), config);
            whole.add(recorder(&log, "whole"), 7).unwrap();
            whole.run(42).unwrap();

            assert_eq!(split.current_step(), 42);
            assert_eq!(split.current_step(), whole.current_step());
            assert_eq!(split.system(), whole.system());
            assert_eq!(fired(&log, "split"), fired(&log, "whole"));
        }
    }

    #[test]
    fn test_run_until_backward_is_rejected() {
        let mut sim = Simulation::new(Counter::default());
        sim.run(10).unwrap();

        let err = sim.run_until(4).unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidTarget {
                target: 4,
                current: 10
            }
        ));
        assert_eq!(sim.current_step(), 10);

        sim.run_until(10).unwrap();
        sim.run_until(13).unwrap();
        assert_eq!(sim.current_step(), 13);
        assert_eq!(*sim.system(), 13);
    }

    #[test]
    fn test_intervals_fire_only_at_multiples() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.add(recorder(&log, "one"), 1).unwrap();
        sim.add(recorder(&log, "five"), 5).unwrap();
        sim.add(recorder(&log, "ten"), 10).unwrap();
        sim.run(50).unwrap();

        assert_eq!(fired(&log, "one"), (1..=50).collect::<Vec<_>>());
        assert_eq!(fired(&log, "five"), vec![5, 10, 15, 20, 25, 30, 35, 40, 45, 50]);
        assert_eq!(fired(&log, "ten"), vec![10, 20, 30, 40, 50]);
    }

    #[test]
    fn test_shared_step_fires_in_registration_order() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.add(recorder(&log, "three"), 3).unwrap();
        sim.add(recorder(&log, "five"), 5).unwrap();
        sim.run(15).unwrap();

        let at_15: Vec<&str> = log
            .borrow()
            .iter()
            .filter(|(_, step)| *step == 15)
            .map(|(label, _)| *label)
            .collect();
        assert_eq!(at_15, vec!["three", "five"]);
        assert_eq!(fired(&log, "three"), vec![3, 6, 9, 12, 15]);
        assert_eq!(fired(&log, "five"), vec![5, 10, 15]);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        let err = sim.add(recorder(&log, "never"), 0).unwrap_err();
        assert!(matches!(err, DriverError::InvalidInterval(0)));
        assert_eq!(sim.callbacks().count(), 0);
        assert_eq!(sim.current_step(), 0);
    }

    #[test]
    fn test_backend_error_stops_at_last_completed_step() {
        let mut sim = Simulation::with_config(Counter::failing_on(10), single_step());
        sim.run(3).unwrap();

        // The 7th advance of this run is the backend's 10th call overall.
        let err = sim.run(10).unwrap_err();
        assert_eq!(sim.current_step(), 3 + 6);
        assert_eq!(err.to_string(), "counter exploded on advance call 10");
        match err {
            DriverError::Backend(boom) => assert_eq!(boom, Boom { call: 10 }),
            other => panic!("expected backend error, got {:?}", other),
        }
        assert_eq!(sim.backend().calls.len(), 9);
    }

    #[test]
    fn test_callback_added_mid_run_is_not_retroactive() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.run(7).unwrap();
        sim.add(recorder(&log, "late"), 5).unwrap();
        sim.run_until(20).unwrap();
        assert_eq!(fired(&log, "late"), vec![10, 15, 20]);
    }

    #[test]
    fn test_start_step_fires_only_when_requested() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.add(recorder(&log, "plain"), 10).unwrap();
        sim.add_with(
            recorder(&log, "eager"),
            10,
            CallbackOptions::named("eager").fire_at_start(),
        )
        .unwrap();
        sim.run(50).unwrap();

        assert_eq!(fired(&log, "plain"), vec![10, 20, 30, 40, 50]);
        assert_eq!(fired(&log, "eager"), vec![0, 10, 20, 30, 40, 50]);

        // Start evaluation happens once; the next run does not refire step 50.
        sim.run(5).unwrap();
        assert_eq!(fired(&log, "eager").len(), 6);
    }

    #[test]
    fn test_fire_at_start_after_resume() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.run(5).unwrap();
        sim.add_with(
            recorder(&log, "aligned"),
            5,
            CallbackOptions::default().fire_at_start(),
        )
        .unwrap();
        sim.add_with(
            recorder(&log, "unaligned"),
            3,
            CallbackOptions::default().fire_at_start(),
        )
        .unwrap();
        sim.run(10).unwrap();

        assert_eq!(fired(&log, "aligned"), vec![5, 10, 15]);
        assert_eq!(fired(&log, "unaligned"), vec![6, 9, 12, 15]);
    }

    #[test]
    fn test_run_zero_is_a_noop() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.add(recorder(&log, "tick"), 1).unwrap();
        sim.run(0).unwrap();
        assert_eq!(sim.current_step(), 0);
        assert!(sim.backend().calls.is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_auto_increment_advances_in_one_shot_without_callbacks() {
        let mut sim = Simulation::new(Counter::default());
        sim.run(12).unwrap();
        assert_eq!(sim.backend().calls, vec![12]);

        let log: Log = Rc::default();
        sim.add(recorder(&log, "tick"), 4).unwrap();
        sim.run(6).unwrap();
        assert_eq!(&sim.backend().calls[1..], &[1, 1, 1, 1, 1, 1]);
        assert_eq!(fired(&log, "tick"), vec![16]);
    }

    #[test]
    fn test_checkpoint_increment_jumps_between_firing_steps() {
        let config = DriverConfig {
            increment: Increment::Checkpoint,
            ..DriverConfig::default()
        };
        let log: Log = Rc::default();
        let mut sim = Simulation::with_config(Counter::default(), config);
        sim.add(recorder(&log, "four"), 4).unwrap();
        sim.add(recorder(&log, "six"), 6).unwrap();
        sim.run(12).unwrap();

        assert_eq!(sim.backend().calls, vec![4, 2, 2, 4]);
        assert_eq!(fired(&log, "four"), vec![4, 8, 12]);
        assert_eq!(fired(&log, "six"), vec![6, 12]);

        // Never overshoots the run target.
        sim.run(3).unwrap();
        assert_eq!(&sim.backend().calls[4..], &[3]);
        assert_eq!(sim.current_step(), 15);
    }

    #[test]
    fn test_callback_error_aborts_run() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.add_with(
            |sim: &Simulation<Counter>| {
                if sim.current_step() == 6 {
                    anyhow::bail!("disk full");
                }
                Ok(())
            },
            3,
            CallbackOptions::named("writer"),
        )
        .unwrap();
        sim.add(recorder(&log, "after"), 3).unwrap();

        let err = sim.run(10).unwrap_err();
        match &err {
            DriverError::Callback { name, step, source } => {
                assert_eq!(name, "writer");
                assert_eq!(*step, 6);
                assert_eq!(source.to_string(), "disk full");
            }
            other => panic!("expected callback error, got {:?}", other),
        }
        assert_eq!(sim.current_step(), 6);
        assert_eq!(fired(&log, "after"), vec![3]);

        // Registrations survive the failed dispatch.
        assert_eq!(sim.callbacks().count(), 2);
    }

    #[test]
    fn test_callback_sees_driver_state() {
        let seen: Rc<RefCell<Vec<(u64, u64)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let mut sim = Simulation::new(Counter::default());
        sim.add(
            move |sim: &Simulation<Counter>| {
                sink.borrow_mut().push((sim.current_step(), *sim.system()));
                Ok(())
            },
            4,
        )
        .unwrap();
        sim.run(8).unwrap();
        assert_eq!(*seen.borrow(), vec![(4, 4), (8, 8)]);
    }

    #[test]
    fn test_default_callback_names() {
        let log: Log = Rc::default();
        let mut sim = Simulation::new(DryRun::new(()));
        sim.add(recorder(&log, "a"), 2).unwrap();
        sim.add_with(recorder(&log, "b"), 3, CallbackOptions::named("named"))
            .unwrap();
        sim.add(recorder(&log, "c"), 5).unwrap();
        let listed: Vec<(&str, u64)> = sim.callbacks().collect();
        assert_eq!(
            listed,
            vec![("callback-0", 2), ("named", 3), ("callback-2", 5)]
        );
    }

    #[test]
    fn test_metrics_observer() {
        let metrics = Arc::new(RunMetrics::new());
        let log: Log = Rc::default();
        let mut sim = Simulation::new(Counter::default());
        sim.add_observer(metrics.clone());
        sim.add_with(recorder(&log, "tick"), 5, CallbackOptions::named("tick"))
            .unwrap();
        sim.run(20).unwrap();
        sim.run(0).unwrap();

        assert_eq!(metrics.get_runs(), 2);
        assert_eq!(metrics.get_backend_calls(), 20);
        assert_eq!(metrics.get_steps(), 20);
        assert_eq!(metrics.get_callbacks_fired(), 4);
        assert_eq!(metrics.get_callback_count("tick"), 4);
    }

    #[test]
    fn test_observer_sees_stop_on_failure() {
        let stops = Arc::new(StopRecorder::default());
        let mut sim = Simulation::with_config(Counter::failing_on(3), single_step());
        sim.add_observer(stops.clone());
        sim.run(4).unwrap_err();
        sim.run(1).unwrap();
        assert_eq!(*stops.stops.lock().unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_step_overflow() {
        let mut sim = Simulation::new(Counter::default());
        let checkpoint = Checkpoint::new("counter", u64::MAX - 1, serde_json::json!({ "value": 0 }));
        sim.restore(checkpoint).unwrap();
        let err = sim.run(5).unwrap_err();
        assert!(matches!(err, DriverError::StepOverflow { steps: 5, .. }));
        assert_eq!(sim.current_step(), u64::MAX - 1);
        sim.run(1).unwrap();
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut first = Simulation::new(Counter::default());
        first.run(8).unwrap();
        let checkpoint = first.checkpoint();
        assert_eq!(checkpoint.backend, "counter");
        assert_eq!(checkpoint.current_step, 8);

        let mut resumed = Simulation::new(Counter::default());
        resumed.restore(checkpoint.clone()).unwrap();
        assert_eq!(resumed.current_step(), 8);
        assert_eq!(*resumed.system(), 8);

        // A checkpoint behind the current step would move the counter back.
        resumed.run(4).unwrap();
        let err = resumed.restore(checkpoint).unwrap_err();
        assert!(matches!(
            err,
            DriverError::InvalidTarget {
                target: 8,
                current: 12
            }
        ));
    }

    #[test]
    fn test_checkpoint_from_other_backend_is_rejected() {
        let mut sim = Simulation::new(Counter::default());
        let foreign = Checkpoint::new("dry_run", 3, serde_json::Value::Null);
        let err = sim.restore(foreign).unwrap_err();
        assert!(matches!(err, DriverError::CheckpointMismatch { .. }));

        let broken = Checkpoint::new("counter", 3, serde_json::json!({ "nope": 1 }));
        let err = sim.restore(broken).unwrap_err();
        assert!(matches!(err, DriverError::Backend(Boom { call: 0 })));
        assert_eq!(sim.current_step(), 0);
    }

    #[test]
    fn test_random_walk_resume_from_checkpoint_file() {
        let path = std::env::temp_dir()
            .join("cadence-integration")
            .join("walk_checkpoint.json");
        let walker = || RandomWalk::new(System::lattice(8, vec![3.0, 3.0], "A"), 42);

        let mut reference = Simulation::new(walker());
        reference.run(30).unwrap();

        let mut first = Simulation::new(walker());
        first.run(12).unwrap();
        first.checkpoint().to_file(&path).unwrap();

        let mut resumed = Simulation::new(walker());
        resumed.restore(Checkpoint::from_file(&path).unwrap()).unwrap();
        resumed.run_until(30).unwrap();

        assert_eq!(resumed.current_step(), 30);
        assert_eq!(resumed.system(), reference.system());
    }

    #[test]
    fn test_trajectory_writer_records_random_walk() {
        let path = std::env::temp_dir()
            .join("cadence-integration")
            .join("walk.jsonl");
        let backend = RandomWalk::new(System::lattice(8, vec![4.0, 4.0], "A"), 5);
        let trajectory: JsonlTrajectory<System> = JsonlTrajectory::create(&path, 0.5).unwrap();

        let mut sim = Simulation::new(backend);
        sim.add_callback(
            TrajectoryWriter::new(trajectory),
            10,
            CallbackOptions::named("trajectory").fire_at_start(),
        )
        .unwrap();
        sim.run(30).unwrap();
        let last = sim.system().clone();
        drop(sim);

        let mut stored: JsonlTrajectory<System> = JsonlTrajectory::open(&path).unwrap();
        assert_eq!(stored.steps(), &[0, 10, 20, 30]);
        assert_eq!(stored.times(), vec![0.0, 5.0, 10.0, 15.0]);
        assert_eq!(stored.read(3).unwrap(), last);
        assert_eq!(stored.read(0).unwrap().len(), 8);
    }
}
