//! End-to-end runs of the orchestrator against a scripted transport.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use fleet_checkup::checks::CheckOutcome;
use fleet_checkup::lifecycle::phase::RunPhase;
use fleet_checkup::orchestrator::{Host, Orchestrator, CONNECTION_KIND};
use fleet_checkup::report::Outcome;
use fleet_checkup::transport::{Connection, Credential, Transport, TransportError};

mod common;

use common::{builtin_registry, check, context, hosts, MemorySink, ScriptedTransport};

const NTP_CMD: &str = "ntpdate -q 10.0.0.123";
const ULIMIT_CMD: &str = "ulimit -n";

fn orchestrator(ctx: fleet_checkup::orchestrator::PipelineContext, capacity: usize) -> Orchestrator {
    Orchestrator::new(ctx, Arc::new(MemorySink::default()), capacity, 0)
}

#[tokio::test]
async fn test_two_host_scenario() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply_on("10.0.0.1", NTP_CMD, common::NTP_DRIFTED)
            .reply_on("10.0.0.1", ULIMIT_CMD, "65535\n")
            .unreachable("10.0.0.2"),
    );
    let ctx = context(
        vec![check("ntp", "root", NTP_CMD), check("ulimit", "root", ULIMIT_CMD)],
        builtin_registry(),
        transport.clone(),
    );

    let outcome = orchestrator(ctx, 10)
        .run(hosts(&["10.0.0.1", "10.0.0.2"]))
        .await
        .unwrap();
    let report = &outcome.finalized.report;

    assert_eq!(report.len(), 2);
    assert_eq!(
        report.row(&Host::from("10.0.0.1")).unwrap().cells(),
        vec![
            "10.0.0.1",
            "yes",
            "10.0.0.1 ntp checkup exception, failed to execute command ntpdate -q 10.0.0.123: -3.512000",
            "yes",
        ]
    );
    assert_eq!(
        report.row(&Host::from("10.0.0.2")).unwrap().cells(),
        vec![
            "10.0.0.2",
            "10.0.0.2 connection failed, no route to host",
            "not attempted",
            "not attempted",
        ]
    );

    let summary = &outcome.finalized.summary;
    assert_eq!(summary.total_hosts, 2);
    assert_eq!(summary.connection_failures, 1);
    assert_eq!(
        summary.per_kind,
        vec![("ntp".to_string(), 1), ("ulimit".to_string(), 0)]
    );

    // Every opened connection was closed.
    let counters = &transport.counters;
    assert_eq!(counters.get(&counters.connects), 1);
    assert_eq!(counters.get(&counters.closes), 1);
}

#[tokio::test]
async fn test_every_target_host_gets_a_row() {
    let targets = ["10.0.1.1", "10.0.1.2", "10.0.1.3", "10.0.1.4", "10.0.1.5"];
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ULIMIT_CMD, "65535\n")
            .reply_on("10.0.1.3", ULIMIT_CMD, "1024\n")
            .unreachable("10.0.1.5"),
    );
    let ctx = context(vec![check("ulimit", "root", ULIMIT_CMD)], builtin_registry(), transport);

    let outcome = orchestrator(ctx, 2).run(hosts(&targets)).await.unwrap();
    let report = &outcome.finalized.report;

    assert_eq!(report.len(), targets.len());
    for host in targets {
        assert!(report.row(&Host::from(host)).is_some(), "missing row for {host}");
    }
    // Failing hosts come first, in arrival order, then passing hosts in target order.
    let passing: Vec<&str> = report.rows()[2..].iter().map(|r| r.host.as_str()).collect();
    assert_eq!(passing, vec!["10.0.1.1", "10.0.1.2", "10.0.1.4"]);
    assert_eq!(outcome.dispatch.records_sent, 2);
}

#[tokio::test]
async fn test_panicking_check_is_isolated() {
    let mut registry = builtin_registry();
    registry.register("fragile", |output| {
        let fields: Vec<&str> = output.split_whitespace().collect();
        Ok(if fields[3] == "ok" {
            CheckOutcome::Pass
        } else {
            CheckOutcome::Fail(fields[3].to_string())
        })
    });
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("probe", "a b c ok")
            .reply_on("10.0.0.2", "probe", "short")
            .reply(ULIMIT_CMD, "65535\n"),
    );
    let ctx = context(
        vec![check("fragile", "root", "probe"), check("ulimit", "root", ULIMIT_CMD)],
        registry,
        transport,
    );

    let outcome = orchestrator(ctx, 10)
        .run(hosts(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]))
        .await
        .unwrap();
    let report = &outcome.finalized.report;

    let broken = Host::from("10.0.0.2");
    let cell = report.outcome(&broken, "fragile").unwrap();
    assert!(cell.as_cell().contains("check panicked"), "{cell:?}");
    // The rest of the pipeline and the other hosts are unaffected.
    assert_eq!(report.outcome(&broken, "ulimit"), Some(&Outcome::Pass));
    assert_eq!(report.outcome(&Host::from("10.0.0.1"), "fragile"), Some(&Outcome::Pass));
    assert_eq!(report.outcome(&Host::from("10.0.0.3"), "fragile"), Some(&Outcome::Pass));
    assert_eq!(report.failure_count("fragile"), 1);
}

#[tokio::test]
async fn test_execution_and_parse_errors_do_not_stop_pipeline() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .exit_on("10.0.0.1", NTP_CMD, 1, "no server suitable for synchronization found")
            .reply_on("10.0.0.1", ULIMIT_CMD, "unlimited\n"),
    );
    let ctx = context(
        vec![check("ntp", "root", NTP_CMD), check("ulimit", "root", ULIMIT_CMD)],
        builtin_registry(),
        transport.clone(),
    );

    let outcome = orchestrator(ctx, 10).run(hosts(&["10.0.0.1"])).await.unwrap();
    let report = &outcome.finalized.report;
    let host = Host::from("10.0.0.1");

    assert!(report
        .outcome(&host, "ntp")
        .unwrap()
        .as_cell()
        .contains("no server suitable"));
    assert!(report
        .outcome(&host, "ulimit")
        .unwrap()
        .as_cell()
        .contains("invalid number \"unlimited\""));
    assert_eq!(report.outcome(&host, CONNECTION_KIND), Some(&Outcome::Pass));
    assert_eq!(transport.counters.get(&transport.counters.executes), 2);
}

#[tokio::test]
async fn test_connection_failure_stops_host_pipeline() {
    let transport = Arc::new(ScriptedTransport::new().reply(ULIMIT_CMD, "65535\n"));
    let ctx = context(
        vec![
            check("ulimit", "root", ULIMIT_CMD),
            // No credential for this identity, so the connection cannot be made.
            check("ntp", "nobody", NTP_CMD),
            check("zabbix_agent", "root", "pgrep -c zabbix_agentd"),
        ],
        builtin_registry(),
        transport.clone(),
    );

    let outcome = orchestrator(ctx, 10).run(hosts(&["10.0.0.1"])).await.unwrap();
    let row = outcome
        .finalized
        .report
        .row(&Host::from("10.0.0.1"))
        .unwrap()
        .clone();

    assert_eq!(
        row.connection,
        Outcome::Failed(
            "10.0.0.1 connection failed, no credential configured for identity `nobody`".into()
        )
    );
    assert_eq!(
        row.checks,
        vec![Outcome::Pass, Outcome::NotAttempted, Outcome::NotAttempted]
    );
    // Only the first check ran; its connection was still closed.
    let counters = &transport.counters;
    assert_eq!(counters.get(&counters.executes), 1);
    assert_eq!(counters.get(&counters.closes), 1);
}

#[tokio::test]
async fn test_excluded_host_skips_check() {
    let mut ulimit = check("ulimit", "root", ULIMIT_CMD);
    ulimit.excluded_hosts = vec!["10.0.0.2".into()];
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(NTP_CMD, common::NTP_OK)
            .reply(ULIMIT_CMD, "65535\n")
            .reply_on("10.0.0.2", ULIMIT_CMD, "1024\n"),
    );
    let ctx = context(
        vec![check("ntp", "root", NTP_CMD), ulimit],
        builtin_registry(),
        transport.clone(),
    );

    let outcome = orchestrator(ctx, 10)
        .run(hosts(&["10.0.0.1", "10.0.0.2"]))
        .await
        .unwrap();
    let report = &outcome.finalized.report;

    assert_eq!(
        report.outcome(&Host::from("10.0.0.2"), "ulimit"),
        Some(&Outcome::Excluded)
    );
    assert_eq!(report.failure_count("ulimit"), 0);
    assert_eq!(outcome.dispatch.records_sent, 0);
    // ntp on both hosts, ulimit only on the first.
    assert_eq!(transport.counters.get(&transport.counters.executes), 3);
}

#[tokio::test]
async fn test_small_channel_loses_nothing() {
    let targets: Vec<String> = (1..=40).map(|i| format!("10.9.0.{i}")).collect();
    let mut transport = ScriptedTransport::new();
    for host in &targets {
        transport = transport.unreachable(host);
    }
    let ctx = context(
        vec![check("ulimit", "root", ULIMIT_CMD)],
        builtin_registry(),
        Arc::new(transport),
    );
    let target_refs: Vec<&str> = targets.iter().map(String::as_str).collect();

    let outcome = orchestrator(ctx, 1).run(hosts(&target_refs)).await.unwrap();

    assert_eq!(outcome.finalized.report.len(), 40);
    assert_eq!(outcome.finalized.report.failure_count(CONNECTION_KIND), 40);
    assert_eq!(outcome.finalized.summary.connection_failures, 40);
    assert_eq!(outcome.dispatch.records_sent, 40);
}

#[tokio::test]
async fn test_empty_target_set() {
    let transport = Arc::new(ScriptedTransport::new());
    let ctx = context(
        vec![check("ulimit", "root", ULIMIT_CMD)],
        builtin_registry(),
        transport.clone(),
    );

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator(ctx, 10).run(hosts(&[])),
    )
    .await
    .expect("run must not block")
    .unwrap();

    assert!(outcome.finalized.report.is_empty());
    assert_eq!(outcome.finalized.summary.total_hosts, 0);
    assert_eq!(outcome.dispatch.hosts, 0);
    assert_eq!(transport.counters.get(&transport.counters.connects), 0);
}

#[tokio::test]
async fn test_concurrency_limit() {
    let targets: Vec<String> = (1..=8).map(|i| format!("10.8.0.{i}")).collect();
    let target_refs: Vec<&str> = targets.iter().map(String::as_str).collect();
    let checks = vec![check("ulimit", "root", ULIMIT_CMD)];

    let limited = Arc::new(
        ScriptedTransport::new()
            .reply(ULIMIT_CMD, "65535\n")
            .with_delay(Duration::from_millis(20)),
    );
    let ctx = context(checks.clone(), builtin_registry(), limited.clone());
    Orchestrator::new(ctx, Arc::new(MemorySink::default()), 10, 2)
        .run(hosts(&target_refs))
        .await
        .unwrap();
    assert!(limited.counters.max_active.load(Ordering::SeqCst) <= 2);
    assert_eq!(limited.counters.get(&limited.counters.connects), 8);

    let unlimited = Arc::new(
        ScriptedTransport::new()
            .reply(ULIMIT_CMD, "65535\n")
            .with_delay(Duration::from_millis(20)),
    );
    let ctx = context(checks, builtin_registry(), unlimited.clone());
    orchestrator(ctx, 10).run(hosts(&target_refs)).await.unwrap();
    assert!(unlimited.counters.max_active.load(Ordering::SeqCst) > 2);
}

#[tokio::test]
async fn test_run_ends_finalized() {
    let transport = Arc::new(ScriptedTransport::new().reply(ULIMIT_CMD, "65535\n"));
    let ctx = context(vec![check("ulimit", "root", ULIMIT_CMD)], builtin_registry(), transport);
    let orchestrator = orchestrator(ctx, 10);
    let phase = orchestrator.phase();
    assert_eq!(*phase.borrow(), RunPhase::Idle);

    orchestrator.run(hosts(&["10.0.0.1"])).await.unwrap();

    assert_eq!(*phase.borrow(), RunPhase::Finalized);
    // A second run on the same orchestrator is refused.
    assert!(orchestrator.run(hosts(&["10.0.0.1"])).await.is_err());
}

#[tokio::test]
async fn test_overlapping_runs_have_one_winner() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(ULIMIT_CMD, "65535\n")
            .with_delay(Duration::from_millis(20)),
    );
    let ctx = context(
        vec![check("ulimit", "root", ULIMIT_CMD)],
        builtin_registry(),
        transport.clone(),
    );
    let sink = Arc::new(MemorySink::default());
    let orchestrator = Orchestrator::new(ctx, sink.clone(), 10, 0);

    let (first, second) = tokio::join!(
        orchestrator.run(hosts(&["10.0.0.1"])),
        orchestrator.run(hosts(&["10.0.0.1"]))
    );

    assert_eq!(first.is_ok() as usize + second.is_ok() as usize, 1);
    assert_eq!(transport.counters.get(&transport.counters.connects), 1);
    assert_eq!(sink.writes.load(Ordering::SeqCst), 1);
    assert_eq!(*orchestrator.phase().borrow(), RunPhase::Finalized);
}

/// Transport whose connect panics for one host.
struct PanickingTransport {
    inner: ScriptedTransport,
    host: &'static str,
}

#[async_trait]
impl Transport for PanickingTransport {
    async fn connect(
        &self,
        host: &Host,
        credential: &Credential,
    ) -> Result<Box<dyn Connection>, TransportError> {
        if host.as_str() == self.host {
            panic!("transport bug");
        }
        self.inner.connect(host, credential).await
    }
}

#[tokio::test]
async fn test_crashed_host_task_still_reported() {
    let transport = Arc::new(PanickingTransport {
        inner: ScriptedTransport::new()
            .reply(NTP_CMD, common::NTP_OK)
            .reply(ULIMIT_CMD, "65535\n")
            .reply("pgrep -c zabbix_agentd", "4\n"),
        host: "10.0.0.2",
    });
    let mut agent = check("zabbix_agent", "root", "pgrep -c zabbix_agentd");
    agent.excluded_hosts = vec!["10.0.0.2".into()];
    let ctx = fleet_checkup::orchestrator::PipelineContext {
        checks: Arc::new(vec![
            check("ntp", "root", NTP_CMD),
            check("ulimit", "root", ULIMIT_CMD),
            agent,
        ]),
        registry: Arc::new(builtin_registry()),
        transport,
        credentials: common::credentials(),
    };

    let outcome = orchestrator(ctx, 10)
        .run(hosts(&["10.0.0.1", "10.0.0.2"]))
        .await
        .unwrap();
    let report = &outcome.finalized.report;

    assert_eq!(report.len(), 2);
    assert_eq!(outcome.dispatch.crashed, 1);
    let cell = report.outcome(&Host::from("10.0.0.2"), CONNECTION_KIND).unwrap();
    assert!(cell.as_cell().starts_with("10.0.0.2 connection failed, host task aborted"));
    // Nothing from the crashed host counts as a pass; exclusions still show.
    assert_eq!(
        report.row(&Host::from("10.0.0.2")).unwrap().checks,
        vec![Outcome::NotAttempted, Outcome::NotAttempted, Outcome::Excluded]
    );
    assert_eq!(
        report.outcome(&Host::from("10.0.0.1"), "ulimit"),
        Some(&Outcome::Pass)
    );
}
