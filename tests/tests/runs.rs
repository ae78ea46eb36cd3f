use stampede::runner::Runner;
use stampede_core::{Observed, Verdict, METRIC_CHECKS, METRIC_REQUEST_DURATION};
use stampede_tests::*;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[tokio::test(start_paused = true)]
async fn mixed_load_run_passes() {
    init();

    let config = scenario(
        vec![
            stage(Duration::from_secs(2), 20),
            stage(Duration::from_secs(2), 20),
            stage(Duration::from_secs(1), 0),
        ],
        vec![
            threshold(METRIC_REQUEST_DURATION, "p(95) < 200ms"),
            threshold(METRIC_CHECKS, "rate > 0.95"),
        ],
    );

    let runner = Runner::new(config, MockService::with_latency(ms(5))).unwrap();
    let report = runner.run().await;

    assert_eq!(report.verdict, Verdict::Passed);
    assert_eq!(report.error, 0);
    assert_eq!(report.connect_failures, 0);
    assert_eq!(report.peak_concurrency, 20);
    assert!(report.latency_p95 < ms(200));

    // the 70/30 split shows up in the per-operation counts
    let create = &report.operations[0];
    let list = &report.operations[1];
    assert!(create.success > list.success);
    assert!(list.success > 0);
}

#[tokio::test(start_paused = true)]
async fn failing_requests_fail_the_rate_threshold() {
    init();

    let config = scenario(
        vec![stage(Duration::from_secs(3), 10)],
        vec![threshold(METRIC_CHECKS, "rate > 0.95")],
    );

    // every other request fails: the observed rate is ~0.5
    let runner = Runner::new(config, MockService::failing_every(ms(5), 2)).unwrap();
    let report = runner.run().await;

    assert_eq!(report.verdict, Verdict::Failed);
    assert!(report.error > 0);

    let failed = &report.thresholds[0];
    assert!(!failed.passed);
    assert_eq!(failed.metric, METRIC_CHECKS);
    match failed.observed {
        Observed::Rate(rate) => assert!((0.4..0.6).contains(&rate), "rate = {rate}"),
        ref other => panic!("expected a rate observation, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn unreachable_service_is_not_fatal() {
    init();

    let config = scenario(
        vec![stage(Duration::from_secs(2), 5)],
        vec![threshold(METRIC_CHECKS, "rate > 0.95")],
    );

    let runner = Runner::new(config, Unreachable).unwrap();
    let report = runner.run().await;

    // the run completes and reports; it does not abort
    assert_eq!(report.verdict, Verdict::Failed);
    assert_eq!(report.requests, 0);
    assert!(report.connect_failures > 0);
    assert_eq!(report.thresholds[0].observed, Observed::Rate(0.));
}

#[tokio::test(start_paused = true)]
async fn bounded_retry_recovers_from_flaky_connects() {
    init();

    let config = scenario(
        vec![stage(Duration::from_secs(3), 5)],
        vec![threshold(METRIC_CHECKS, "rate >= 0.9")],
    );

    let runner = Runner::new(config, FlakyConnect::new(ms(5), 2)).unwrap();
    let report = runner.run().await;

    assert_eq!(report.connect_failures, 2);
    assert!(report.requests > 0);
    assert_eq!(report.verdict, Verdict::Passed);
}

#[tokio::test(start_paused = true)]
async fn spike_schedule_reaches_its_peak() {
    init();

    let config = scenario(
        vec![
            stage(Duration::from_secs(1), 20),
            stage(Duration::from_secs(1), 20),
            stage(ms(500), 40),
            stage(Duration::from_secs(1), 0),
        ],
        vec![],
    );

    let runner = Runner::new(config, MockService::with_latency(ms(2))).unwrap();
    let report = runner.run().await;

    assert_eq!(report.peak_concurrency, 40);
    // no thresholds declared: vacuous pass
    assert_eq!(report.verdict, Verdict::Passed);
}

#[tokio::test(start_paused = true)]
async fn noisy_latencies_stay_under_a_loose_bound() {
    init();

    let config = scenario(
        vec![stage(Duration::from_secs(2), 10)],
        vec![threshold(METRIC_REQUEST_DURATION, "p(95) < 200ms")],
    );

    let runner = Runner::new(config, NoisyService::new(ms(20), ms(5))).unwrap();
    let report = runner.run().await;

    assert_eq!(report.verdict, Verdict::Passed);
    assert!(report.latency_p95 >= report.latency_p50);
}

#[tokio::test(start_paused = true)]
async fn fixed_seed_gives_a_reproducible_operation_mix() {
    init();

    let run = |seed| async move {
        let mut config = scenario(
            vec![stage(Duration::from_secs(2), 10)],
            vec![],
        );
        config.seed = Some(seed);
        let runner = Runner::new(config, MockService::with_latency(ms(1))).unwrap();
        runner.run().await
    };

    let a = run(99).await;
    let b = run(99).await;
    let diff = a.operations[0].success.abs_diff(b.operations[0].success);
    assert!(diff <= 2, "create counts diverged: {diff}");
    let diff = a.operations[1].success.abs_diff(b.operations[1].success);
    assert!(diff <= 2, "list counts diverged: {diff}");
}
