use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::Mutex;

use benor_common::{Message, NodeId, Result, Value};
use benor_consensus::{ConsensusEngine, EngineConfig, ScriptedCoin};
use benor_node::{
    runtime::{
        consensus_driver::{ConsensusDriver, StartOutcome},
        readiness::Readiness,
    },
    simulation::LocalCluster,
    Config, NodeRuntime,
};
use benor_p2p::ports::Broadcaster;

#[derive(Clone, Default)]
struct MockBroadcaster {
    sent: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl Broadcaster for MockBroadcaster {
    async fn broadcast(&self, msg: Message) -> Result<()> {
        self.sent.lock().await.push(msg);
        Ok(())
    }
}

fn driver(n: usize, f: usize, publisher: &MockBroadcaster) -> ConsensusDriver {
    let engine = ConsensusEngine::new(
        EngineConfig::new(NodeId(0), n, f),
        Box::new(ScriptedCoin::new(vec![Value::One])),
    )
    .unwrap();
    ConsensusDriver::new(engine, Arc::new(publisher.clone()))
}

#[tokio::test]
async fn test_consensus_driver_basic_flow() {
    let publisher = MockBroadcaster::default();
    let driver = driver(4, 1, &publisher);

    driver.start(Value::Zero).await.unwrap();
    assert_eq!(*publisher.sent.lock().await, vec![Message::proposal(1, Value::Zero)]);

    for _ in 0..3 {
        driver.handle_message(Message::proposal(1, Value::Zero)).await;
    }
    assert_eq!(publisher.sent.lock().await.last(), Some(&Message::vote(1, Value::Zero)));

    for _ in 0..3 {
        driver.handle_message(Message::vote(1, Value::Zero)).await;
    }

    let state = driver.state().await;
    assert_eq!(state.decided, Some(true));
    assert_eq!(state.decided_value, Some(Value::Zero));
    assert_eq!(state.round, Some(1));
    // echo for the next round
    assert_eq!(publisher.sent.lock().await.last(), Some(&Message::proposal(2, Value::Zero)));
}

#[tokio::test]
async fn test_concurrent_handlers_act_on_quorum_once() {
    let publisher = MockBroadcaster::default();
    let driver = Arc::new(driver(7, 2, &publisher));
    driver.start(Value::One).await.unwrap();

    let handles: Vec<_> = (0..7)
        .map(|_| {
            let driver = driver.clone();
            tokio::spawn(async move { driver.handle_message(Message::proposal(1, Value::One)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let votes = publisher
        .sent
        .lock()
        .await
        .iter()
        .filter(|m| **m == Message::vote(1, Value::One))
        .count();
    assert_eq!(votes, 1);
}

#[tokio::test]
async fn test_faulty_runtime_stays_silent() {
    let publisher = MockBroadcaster::default();
    let config = Config { faulty: true, ..Config::new(NodeId(3), 4, 1, Value::One) };
    let node = benor_node::build_runtime(&config, Arc::new(publisher.clone()), Readiness::Immediate).unwrap();

    assert_eq!(node.start().await.unwrap(), StartOutcome::Faulty);
    node.handle_message(Message::proposal(1, Value::One)).await;

    assert!(publisher.sent.lock().await.is_empty());
    let state = node.state().await;
    assert_eq!(state.round, None);
    assert_eq!(state.decided, None);
    assert_eq!(state.estimate, None);
}

async fn run_cluster(configs: &[Config], jitter: Duration) -> Vec<benor_common::NodeState> {
    let cluster = LocalCluster::launch(configs, jitter).await.unwrap();
    cluster.start_all().await.unwrap();
    let states = cluster.wait_for_decisions(Duration::from_secs(20)).await.unwrap();
    cluster.stop_all().await;
    states
}

fn assert_agreement(configs: &[Config], states: &[benor_common::NodeState]) -> Value {
    let values: Vec<Value> = configs
        .iter()
        .zip(states)
        .filter(|(config, _)| !config.faulty)
        .map(|(_, state)| state.decided_value.expect("live node without decision"))
        .collect();
    assert!(values.windows(2).all(|w| w[0] == w[1]), "disagreement: {values:?}");
    values[0]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unanimous_cluster_decides_initial_value() {
    for v in [Value::Zero, Value::One] {
        let configs = Config::local_cluster(5, 2, &[v], &[]);
        let states = run_cluster(&configs, Duration::from_millis(2)).await;
        assert_eq!(assert_agreement(&configs, &states), v);
        for state in &states {
            assert_eq!(state.round, Some(1));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cluster_tolerates_faulty_node() {
    let configs = Config::local_cluster(4, 1, &[Value::One], &[3]);
    let states = run_cluster(&configs, Duration::from_millis(2)).await;
    assert_eq!(assert_agreement(&configs, &states), Value::One);
    assert_eq!(states[3].decided, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_cluster_agrees_under_jitter() {
    for seed in 0..10u64 {
        let mut configs = Config::local_cluster(
            7,
            3,
            &[Value::Zero, Value::One, Value::One, Value::Zero],
            if seed % 2 == 0 { &[6] } else { &[] },
        );
        for config in configs.iter_mut() {
            config.coin_seed = Some(seed);
        }
        let states = run_cluster(&configs, Duration::from_millis(3)).await;
        assert_agreement(&configs, &states);
    }
}

#[tokio::test]
async fn test_launch_rejects_misindexed_configs() {
    let mut configs = Config::local_cluster(3, 1, &[Value::Zero], &[]);
    configs.swap(0, 1);
    assert!(LocalCluster::launch(&configs, Duration::ZERO).await.is_err());
}

#[tokio::test]
async fn test_stopped_node_keeps_its_state() {
    let publisher = MockBroadcaster::default();
    let config = Config::new(NodeId(0), 1, 0, Value::One);
    let node: NodeRuntime = benor_node::build_runtime(&config, Arc::new(publisher.clone()), Readiness::Immediate).unwrap();

    assert_eq!(node.start().await.unwrap(), StartOutcome::Started);
    node.stop().await;
    assert_eq!(node.start().await.unwrap(), StartOutcome::Stopped);
    node.handle_message(Message::proposal(1, Value::One)).await;

    let state = node.state().await;
    assert!(state.stopped);
    assert_eq!(state.round, Some(1));
    assert_eq!(state.decided, Some(false));
    assert_eq!(publisher.sent.lock().await.len(), 1);
}
