//! End-to-end pipeline behaviour, driven through the public agent surface
//! with mock convergence layers, agents and routing.

use drover_bpa::bpv7::{
    block::{BlockData, CanonicalBlock},
    block_flags::BlockFlags,
    builder::Builder,
    bundle::Bundle,
    bundle_flags::BundleFlags,
    bundle_id::BundleId,
    eid::Eid,
    status_report::{AdministrativeRecord, ReasonCode, StatusInformation},
};
use drover_bpa::{
    agent::ApplicationAgent,
    async_trait,
    bpa::Bpa,
    cla::{self, ClaRegistry, ConvergenceReceiver, ConvergenceSender},
    config::Config,
    node_ids::NodeIds,
    pack::{BundlePack, Constraint},
    routing::RoutingAgent,
    store::{mem::MemStore, BundleStore},
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct SenderLog {
    sent: Mutex<Vec<(String, Bundle)>>,
    closed: Mutex<Vec<String>>,
    reconnects: AtomicUsize,
}

impl SenderLog {
    fn sent_to(&self, address: &str) -> Vec<Bundle> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == address)
            .map(|(_, b)| b.clone())
            .collect()
    }

    /// Every status report captured by this log, as (status, reason, subject).
    fn reports(&self) -> Vec<(StatusInformation, ReasonCode, BundleId)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, b)| {
                let AdministrativeRecord::BundleStatusReport(report) =
                    AdministrativeRecord::from_payload(b.payload()?).ok()?;
                let status = *report.asserted().first()?;
                Some((status, report.reason, report.bundle_id))
            })
            .collect()
    }
}

struct MockSender {
    peer: Eid,
    address: String,
    fail: AtomicBool,
    log: Arc<SenderLog>,
}

impl MockSender {
    fn new(peer: &str, address: &str, log: &Arc<SenderLog>) -> Arc<Self> {
        Arc::new(Self {
            peer: peer.parse().unwrap(),
            address: address.to_string(),
            fail: AtomicBool::new(false),
            log: log.clone(),
        })
    }

    fn failing(peer: &str, address: &str, log: &Arc<SenderLog>) -> Arc<Self> {
        let sender = Self::new(peer, address, log);
        sender.fail.store(true, Ordering::SeqCst);
        sender
    }
}

#[async_trait]
impl ConvergenceSender for MockSender {
    async fn send(&self, bundle: &Bundle) -> cla::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(cla::Error::LinkClosed(self.address.clone()));
        }
        self.log
            .sent
            .lock()
            .unwrap()
            .push((self.address.clone(), bundle.clone()));
        Ok(())
    }

    fn peer_endpoint(&self) -> Eid {
        self.peer.clone()
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn close(&self) {
        self.log.closed.lock().unwrap().push(self.address.clone());
    }

    fn reconnect(&self) -> Arc<dyn ConvergenceSender> {
        self.log.reconnects.fetch_add(1, Ordering::SeqCst);
        Arc::new(Self {
            peer: self.peer.clone(),
            address: self.address.clone(),
            fail: AtomicBool::new(false),
            log: self.log.clone(),
        })
    }
}

struct MockAgent {
    endpoint: Eid,
    delivered: Mutex<Vec<Bundle>>,
}

impl MockAgent {
    fn new(endpoint: &str) -> Arc<Self> {
        Arc::new(Self {
            endpoint: endpoint.parse().unwrap(),
            delivered: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ApplicationAgent for MockAgent {
    fn endpoint(&self) -> &Eid {
        &self.endpoint
    }

    async fn deliver(&self, bundle: &Bundle) {
        self.delivered.lock().unwrap().push(bundle.clone());
    }
}

struct ChannelReceiver {
    rx: flume::Receiver<Bundle>,
    endpoint: Eid,
    address: String,
}

#[async_trait]
impl ConvergenceReceiver for ChannelReceiver {
    async fn recv(&self) -> Option<Bundle> {
        self.rx.recv_async().await.ok()
    }

    fn endpoint(&self) -> Eid {
        self.endpoint.clone()
    }

    fn address(&self) -> &str {
        &self.address
    }

    async fn close(&self) {}
}

struct MockRouting {
    senders: Mutex<Vec<Arc<dyn ConvergenceSender>>>,
    delete_after_send: bool,
}

#[async_trait]
impl RoutingAgent for MockRouting {
    async fn sender_for_bundle(
        &self,
        _pack: &BundlePack,
        _registry: &ClaRegistry,
    ) -> (Vec<Arc<dyn ConvergenceSender>>, bool) {
        (self.senders.lock().unwrap().clone(), self.delete_after_send)
    }
}

/// A node named `dtn://self/` with an ingress channel and a capture log.
struct TestNode {
    bpa: Bpa,
    store: Arc<MemStore>,
    log: Arc<SenderLog>,
    ingress: flume::Sender<Bundle>,
}

fn test_node(configure: impl FnOnce(&mut Config)) -> TestNode {
    let store = Arc::new(MemStore::new());
    let mut config = Config {
        status_reports: true,
        node_ids: NodeIds {
            dtn: Some("self".into()),
            ipn: None,
        },
        store: Some(store.clone()),
        ..Default::default()
    };
    configure(&mut config);

    let bpa = Bpa::new(&config);
    let (ingress, rx) = flume::unbounded();
    bpa.register_receiver(Arc::new(ChannelReceiver {
        rx,
        endpoint: "dtn://self/".parse().unwrap(),
        address: "mock:ingress".to_string(),
    }));

    TestNode {
        bpa,
        store,
        log: Arc::new(SenderLog::default()),
        ingress,
    }
}

/// Polls until the stored pack satisfies `predicate`; panics after two
/// seconds.
async fn wait_for_pack(
    store: &MemStore,
    id: &BundleId,
    what: &str,
    predicate: impl Fn(&BundlePack) -> bool,
) {
    for _ in 0..2000 {
        if let Some(pack) = store.get(id).await {
            if predicate(&pack) {
                return;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    panic!("Timed out waiting for {what}");
}

/// Polls a synchronous condition; panics after two seconds.
async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    panic!("Timed out waiting for {what}");
}

fn simple_bundle(destination: &str) -> Bundle {
    Builder::new()
        .source("dtn://origin/")
        .destination(destination)
        .lifetime("1h")
        .payload(b"payload".to_vec())
        .build()
        .unwrap()
}

async fn constraints(store: &MemStore, id: &BundleId) -> Vec<Constraint> {
    store
        .get(id)
        .await
        .expect("bundle not in store")
        .constraints()
        .collect()
}

#[tokio::test]
async fn local_to_local_delivery() {
    let node = test_node(|_| {});
    let app = MockAgent::new("dtn://self/app");
    node.bpa.register_agent(app.clone());
    node.bpa
        .register_sender(MockSender::new("dtn://mon/", "mock:mon", &node.log))
        .unwrap();

    let bundle = Builder::new()
        .source("dtn://self/")
        .destination("dtn://self/app")
        .report_to("dtn://mon/reports")
        .lifetime(60_000_000u64)
        .flags(BundleFlags {
            delivery_report_requested: true,
            ..Default::default()
        })
        .payload(b"hello".to_vec())
        .build()
        .unwrap();
    let id = bundle.id.clone();

    node.bpa.send(bundle).await;
    node.bpa.flush().await;

    // Delivered exactly once, to the right agent
    let delivered = app.delivered.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].payload(), Some(b"hello".as_slice()));

    // One DeliveredBundle report went to report-to
    let reports = node.log.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, StatusInformation::DeliveredBundle);
    assert_eq!(reports[0].1, ReasonCode::NoInformation);
    assert_eq!(reports[0].2, id);

    // Terminal: no constraints remain
    assert!(constraints(&node.store, &id).await.is_empty());
}

#[tokio::test]
async fn forward_with_direct_hit() {
    let node = test_node(|_| {});
    node.bpa
        .register_sender(MockSender::new("dtn://peer/", "mock:peer", &node.log))
        .unwrap();

    let bundle = simple_bundle("dtn://peer/");
    let id = bundle.id.clone();
    node.ingress.send(bundle).unwrap();

    // A direct hit is definitive: sent once, then no work remains
    wait_for_pack(&node.store, &id, "direct forward", |p| !p.has_constraints()).await;

    let sent = node.log.sent_to("mock:peer");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, id);
}

#[tokio::test]
async fn forward_with_no_route() {
    let node = test_node(|_| {});

    let bundle = simple_bundle("dtn://elsewhere/app");
    let id = bundle.id.clone();
    node.ingress.send(bundle).unwrap();

    wait_for_pack(&node.store, &id, "contraindication", |p| {
        p.has_constraint(Constraint::Contraindicated)
    })
    .await;
    node.bpa.flush().await;

    assert_eq!(
        constraints(&node.store, &id).await,
        vec![Constraint::Contraindicated]
    );
    // No deletion was requested, so nothing was reported
    assert!(node.log.reports().is_empty());
}

#[tokio::test]
async fn hop_limit_drop() {
    let node = test_node(|_| {});
    node.bpa
        .register_sender(MockSender::new("dtn://mon/", "mock:mon", &node.log))
        .unwrap();

    let mut bundle = Builder::new()
        .source("dtn://origin/")
        .destination("dtn://far/app")
        .report_to("dtn://mon/reports")
        .flags(BundleFlags {
            delete_report_requested: true,
            ..Default::default()
        })
        .hop_count(1)
        .payload(b"x".to_vec())
        .build()
        .unwrap();
    // Already at its limit when it arrives here
    if let BlockData::HopCount(hops) = &mut bundle
        .extension_block_mut(drover_bpa::bpv7::block_type::BlockType::HopCount)
        .unwrap()
        .data
    {
        hops.count = 1;
    }
    let id = bundle.id.clone();

    node.ingress.send(bundle).unwrap();

    wait_for_pack(&node.store, &id, "hop-limit deletion", |p| {
        !p.has_constraints()
    })
    .await;
    node.bpa.flush().await;

    let reports = node.log.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, StatusInformation::DeletedBundle);
    assert_eq!(reports[0].1, ReasonCode::HopLimitExceeded);
    assert_eq!(reports[0].2, id);
}

#[tokio::test]
async fn duplicate_receive_is_suppressed() {
    let node = test_node(|_| {});
    node.bpa
        .register_sender(MockSender::new("dtn://mon/", "mock:mon", &node.log))
        .unwrap();

    let bundle = Builder::new()
        .source("dtn://origin/")
        .destination("dtn://elsewhere/app")
        .report_to("dtn://mon/reports")
        .flags(BundleFlags {
            receipt_report_requested: true,
            ..Default::default()
        })
        .payload(b"dup".to_vec())
        .build()
        .unwrap();
    let id = bundle.id.clone();

    node.ingress.send(bundle.clone()).unwrap();
    wait_for_pack(&node.store, &id, "first receive", |p| {
        p.has_constraint(Constraint::Contraindicated)
    })
    .await;
    let snapshot = node.store.get(&id).await.unwrap();

    node.ingress.send(bundle).unwrap();
    // The duplicate must leave the store unchanged; give it a moment to fail
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    node.bpa.flush().await;

    assert_eq!(node.store.get(&id).await.unwrap(), snapshot);

    // Exactly one ReceivedBundle report, despite two arrivals
    let received = node
        .log
        .reports()
        .into_iter()
        .filter(|(status, ..)| *status == StatusInformation::ReceivedBundle)
        .count();
    assert_eq!(received, 1);
}

#[tokio::test]
async fn send_failure_triggers_link_restart() {
    let node = test_node(|_| {});
    node.bpa
        .register_sender(MockSender::failing("dtn://peer/", "mock:peer", &node.log))
        .unwrap();

    let bundle = simple_bundle("dtn://peer/");
    let id = bundle.id.clone();
    node.ingress.send(bundle).unwrap();

    wait_until("link restart", || {
        node.log.reconnects.load(Ordering::SeqCst) == 1
    })
    .await;
    wait_for_pack(&node.store, &id, "contraindication", |p| {
        p.has_constraint(Constraint::Contraindicated)
    })
    .await;

    // The failed sender was closed, and a fresh one took its address
    assert_eq!(node.log.closed.lock().unwrap().clone(), vec!["mock:peer"]);
    assert_eq!(
        constraints(&node.store, &id).await,
        vec![Constraint::Contraindicated]
    );

    // The replacement link works: a retry forwards the bundle
    node.bpa.retry_contraindicated().await;
    assert_eq!(node.log.sent_to("mock:peer").len(), 1);
    assert!(constraints(&node.store, &id).await.is_empty());
}

#[tokio::test]
async fn speculative_send_keeps_pack_forwardable() {
    let log = Arc::new(SenderLog::default());
    let a = MockSender::new("dtn://a/", "mock:a", &log);
    let b = MockSender::new("dtn://b/", "mock:b", &log);

    let node = test_node(|config| {
        config.routing = Some(Arc::new(MockRouting {
            senders: Mutex::new(vec![a.clone(), b.clone()]),
            delete_after_send: false,
        }));
    });

    let bundle = simple_bundle("dtn://elsewhere/app");
    let id = bundle.id.clone();
    node.ingress.send(bundle).unwrap();

    wait_until("fan-out to both peers", || {
        !log.sent_to("mock:a").is_empty() && !log.sent_to("mock:b").is_empty()
    })
    .await;

    // Both candidates got a copy, and the pack stays forwardable
    assert_eq!(log.sent_to("mock:a").len(), 1);
    assert_eq!(log.sent_to("mock:b").len(), 1);
    assert_eq!(
        constraints(&node.store, &id).await,
        vec![Constraint::ForwardPending]
    );
}

#[tokio::test]
async fn unknown_blocks_walk_in_reverse_order() {
    let node = test_node(|_| {});
    let sink = MockAgent::new("dtn://self/sink");
    node.bpa.register_agent(sink.clone());

    let mut bundle = Builder::new()
        .source("dtn://origin/")
        .destination("dtn://self/sink")
        .hop_count(8)
        .payload(b"walk".to_vec())
        .build()
        .unwrap();
    let remove_me = BlockFlags {
        delete_block_on_failure: true,
        ..Default::default()
    };
    bundle
        .blocks
        .push(CanonicalBlock::new_unrecognised(192, 3, remove_me, vec![1]));
    bundle
        .blocks
        .push(CanonicalBlock::new_unrecognised(193, 4, remove_me, vec![2]));
    let id = bundle.id.clone();

    node.ingress.send(bundle).unwrap();

    wait_until("delivery", || !sink.delivered.lock().unwrap().is_empty()).await;

    // Both flagged blocks excised, nothing else disturbed
    let delivered = sink.delivered.lock().unwrap()[0].clone();
    assert_eq!(delivered.id, id);
    assert_eq!(
        delivered
            .blocks
            .iter()
            .map(|b| b.block_number)
            .collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(delivered.hop_count().map(|h| h.limit), Some(8));
    assert_eq!(delivered.payload(), Some(b"walk".as_slice()));
}

#[tokio::test]
async fn unknown_block_can_delete_bundle() {
    let node = test_node(|_| {});
    node.bpa
        .register_sender(MockSender::new("dtn://mon/", "mock:mon", &node.log))
        .unwrap();

    let mut bundle = Builder::new()
        .source("dtn://origin/")
        .destination("dtn://self/nowhere")
        .report_to("dtn://mon/reports")
        .flags(BundleFlags {
            delete_report_requested: true,
            ..Default::default()
        })
        .payload(b"x".to_vec())
        .build()
        .unwrap();
    bundle.blocks.push(CanonicalBlock::new_unrecognised(
        200,
        2,
        BlockFlags {
            report_on_failure: true,
            delete_bundle_on_failure: true,
            ..Default::default()
        },
        vec![0xFF],
    ));
    let id = bundle.id.clone();

    node.ingress.send(bundle).unwrap();

    wait_for_pack(&node.store, &id, "block-driven deletion", |p| {
        !p.has_constraints()
    })
    .await;
    node.bpa.flush().await;

    let reports = node.log.reports();
    assert_eq!(reports.len(), 2);
    assert!(reports.contains(&(
        StatusInformation::ReceivedBundle,
        ReasonCode::BlockUnintelligible,
        id.clone()
    )));
    assert!(reports.contains(&(
        StatusInformation::DeletedBundle,
        ReasonCode::BlockUnintelligible,
        id
    )));
}

#[tokio::test]
async fn delivered_report_releases_subject() {
    let node = test_node(|_| {});

    // A bundle stuck here, waiting for a route
    let subject = simple_bundle("dtn://remote/app");
    let subject_id = subject.id.clone();
    node.ingress.send(subject.clone()).unwrap();
    wait_for_pack(&node.store, &subject_id, "contraindication", |p| {
        p.has_constraint(Constraint::Contraindicated)
    })
    .await;

    // Downstream reports it delivered
    let record = AdministrativeRecord::BundleStatusReport(
        drover_bpa::bpv7::status_report::BundleStatusReport::new(
            &subject,
            StatusInformation::DeliveredBundle,
            ReasonCode::NoInformation,
            None,
        ),
    );
    let report = Builder::new()
        .source("dtn://remote/")
        .destination("dtn://self/")
        .administrative()
        .payload(record.to_payload())
        .build()
        .unwrap();
    let report_id = report.id.clone();

    node.ingress.send(report).unwrap();

    wait_for_pack(&node.store, &subject_id, "subject release", |p| {
        !p.has_constraints()
    })
    .await;

    // The report itself is consumed at local delivery
    wait_for_pack(&node.store, &report_id, "report delivery", |p| {
        !p.has_constraints()
    })
    .await;
}

#[tokio::test]
async fn malformed_admin_record_is_deleted_at_delivery() {
    let node = test_node(|_| {});

    let report = Builder::new()
        .source("dtn://remote/")
        .destination("dtn://self/")
        .administrative()
        .payload(b"not an administrative record".to_vec())
        .build()
        .unwrap();
    let id = report.id.clone();

    node.ingress.send(report).unwrap();

    wait_for_pack(&node.store, &id, "deletion", |p| !p.has_constraints()).await;
}

#[tokio::test]
async fn recovery_resumes_forwarding() {
    let store = Arc::new(MemStore::new());
    let log = Arc::new(SenderLog::default());

    // A pack persisted mid-forward by a previous incarnation
    let bundle = simple_bundle("dtn://peer/");
    let id = bundle.id.clone();
    let mut pack = BundlePack::new(bundle);
    pack.add_constraint(Constraint::ForwardPending);
    store.push(&pack).await.unwrap();

    let config = Config {
        node_ids: NodeIds {
            dtn: Some("self".into()),
            ipn: None,
        },
        store: Some(store.clone()),
        ..Default::default()
    };
    let bpa = Bpa::new(&config);
    bpa.register_sender(MockSender::new("dtn://peer/", "mock:peer", &log))
        .unwrap();

    bpa.start().await;

    assert_eq!(log.sent_to("mock:peer").len(), 1);
    assert!(store.get(&id).await.unwrap().constraints().next().is_none());
}

#[tokio::test]
async fn anonymous_source_may_transmit_but_foreign_may_not() {
    let node = test_node(|_| {});
    let sink = MockAgent::new("dtn://self/sink");
    node.bpa.register_agent(sink.clone());

    // dtn:none is a legal anonymous source
    let anonymous = Builder::new()
        .source(Eid::Null)
        .destination("dtn://self/sink")
        .payload(b"anon".to_vec())
        .build()
        .unwrap();
    node.bpa.send(anonymous).await;
    assert_eq!(sink.delivered.lock().unwrap().len(), 1);

    // A source belonging to another node is deleted outright
    let foreign = simple_bundle("dtn://self/sink");
    let id = foreign.id.clone();
    node.bpa.send(foreign).await;
    node.bpa.flush().await;

    assert_eq!(sink.delivered.lock().unwrap().len(), 1);
    assert!(constraints(&node.store, &id).await.is_empty());
}

#[tokio::test]
async fn transmit_assigns_unique_sequence_numbers() {
    let node = test_node(|_| {});
    let sink = MockAgent::new("dtn://self/sink");
    node.bpa.register_agent(sink.clone());

    let timestamp = drover_bpa::bpv7::creation_timestamp::CreationTimestamp::now();
    for _ in 0..10 {
        let bundle = Builder::new()
            .source("dtn://self/")
            .destination("dtn://self/sink")
            .creation_timestamp(timestamp)
            .payload(b"seq".to_vec())
            .build()
            .unwrap();
        node.bpa.send(bundle).await;
    }

    let delivered = sink.delivered.lock().unwrap();
    let ids = delivered
        .iter()
        .map(|b| b.id.clone())
        .collect::<std::collections::HashSet<_>>();
    assert_eq!(delivered.len(), 10);
    assert_eq!(ids.len(), 10, "identities must be unique per source");
}
