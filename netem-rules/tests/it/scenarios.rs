use netem_rules::{Error, command::Recorder, topology::Topology};

const TEARDOWN_ETH0: [&str; 3] =
    ["tc qdisc del dev eth0 root", "tc qdisc del dev eth0 ingress", "modprobe -r ifb"];

fn topology(direction: &str) -> Topology {
    format!(
        r#"
rate = 1000

[[interfaces.eth0.{direction}]]
netem = "delay 30ms 10ms"
cidrs = ["192.168.70.2/32"]
"#
    )
    .parse()
    .unwrap()
}

#[test]
fn outbound_scenario() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut recorder = Recorder::new();
    let applied = topology("out").plan().unwrap().apply(&mut recorder).unwrap();

    let lines = recorder.lines();
    assert_eq!(lines[..3], TEARDOWN_ETH0);
    assert_eq!(
        lines[3..],
        [
            "tc qdisc add dev eth0 handle 1: root htb",
            "tc class add dev eth0 parent 1: classid 1:1 htb rate 1000Mbit",
            "tc class add dev eth0 parent 1:1 classid 1:10 htb rate 1000Mbit",
            "tc qdisc add dev eth0 parent 1:10 netem delay 30ms 10ms",
            "tc filter add dev eth0 protocol ip parent 1: u32 match ip dst 192.168.70.2/32 flowid 1:10",
        ]
    );

    let eth0 = &applied.interfaces[0];
    assert!(eth0.ingress.is_none());
    let classes: Vec<_> =
        eth0.egress.as_ref().unwrap().tree().classes().iter().map(ToString::to_string).collect();
    assert_eq!(classes, ["1:10"]);
}

#[test]
fn both_scenario() {
    let _ = tracing_subscriber::fmt::try_init();

    let mut recorder = Recorder::new();
    let applied = topology("both").plan().unwrap().apply(&mut recorder).unwrap();

    let lines = recorder.lines();
    assert_eq!(lines[..3], TEARDOWN_ETH0);
    assert_eq!(
        lines[3..],
        [
            // Outbound, exactly as in the `out` scenario.
            "tc qdisc add dev eth0 handle 1: root htb",
            "tc class add dev eth0 parent 1: classid 1:1 htb rate 1000Mbit",
            "tc class add dev eth0 parent 1:1 classid 1:10 htb rate 1000Mbit",
            "tc qdisc add dev eth0 parent 1:10 netem delay 30ms 10ms",
            "tc filter add dev eth0 protocol ip parent 1: u32 match ip dst 192.168.70.2/32 flowid 1:10",
            // Inbound, redirected through ifb0.
            "modprobe ifb",
            "ip link set dev ifb0 up",
            "tc qdisc add dev eth0 handle ffff: ingress",
            "tc filter add dev eth0 parent ffff: protocol all u32 match u32 0 0 action mirred egress redirect dev ifb0",
            "tc qdisc add dev ifb0 handle 1: root htb",
            "tc class add dev ifb0 parent 1: classid 1:1 htb rate 1000Mbit",
            "tc class add dev ifb0 parent 1:1 classid 1:10 htb rate 1000Mbit",
            "tc qdisc add dev ifb0 parent 1:10 netem delay 30ms 10ms",
            "tc filter add dev ifb0 protocol ip parent 1: u32 match ip src 192.168.70.2/32 flowid 1:10",
        ]
    );

    let ingress = applied.interfaces[0].ingress.as_ref().unwrap();
    assert_eq!(ingress.redirect().physical, "eth0");
    assert_eq!(ingress.tree().device(), "ifb0");
}

#[test]
fn inbound_only_leaves_egress_untouched() {
    let mut recorder = Recorder::new();
    topology("in").plan().unwrap().apply(&mut recorder).unwrap();

    let lines = recorder.lines();
    assert!(lines[3..].iter().all(|l| !l.contains("dev eth0 handle 1:")));
    assert!(lines[3..].iter().filter(|l| l.contains("u32 match ip ")).all(|l| l.contains("match ip src")));
}

#[test]
fn rules_keep_declaration_order() {
    let topology: Topology = r#"
[[interfaces.eth0.out]]
netem = "delay 10ms"
cidrs = ["10.0.0.1/32"]

[[interfaces.eth0.out]]
netem = "loss 2%"
cidrs = ["10.0.0.2/32", "10.0.0.3/32"]

[[interfaces.eth0.both]]
netem = "delay 100ms"
cidrs = ["10.0.1.0/24"]
"#
    .parse()
    .unwrap();

    let mut recorder = Recorder::new();
    topology.plan().unwrap().apply(&mut recorder).unwrap();

    let netems: Vec<_> =
        recorder.lines().into_iter().filter(|l| l.contains(" netem ")).collect();
    assert_eq!(
        netems,
        [
            "tc qdisc add dev eth0 parent 1:10 netem delay 10ms",
            "tc qdisc add dev eth0 parent 1:11 netem loss 2%",
            "tc qdisc add dev eth0 parent 1:12 netem delay 100ms",
            "tc qdisc add dev ifb0 parent 1:10 netem delay 100ms",
        ]
    );

    let roots = recorder.lines().iter().filter(|l| l.ends_with("root htb")).count();
    assert_eq!(roots, 2);
}

#[test]
fn multiple_interfaces_are_cleared_before_configuring() {
    let topology: Topology = r#"
[[interfaces.eth0.in]]
netem = "delay 10ms"
cidrs = ["10.0.0.1/32"]

[[interfaces.eth1.in]]
netem = "delay 20ms"
cidrs = ["10.0.0.2/32"]
"#
    .parse()
    .unwrap();

    let mut recorder = Recorder::new();
    topology.plan().unwrap().apply(&mut recorder).unwrap();

    let lines = recorder.lines();
    let last_unload = lines.iter().rposition(|l| l == "modprobe -r ifb").unwrap();
    let first_load = lines.iter().position(|l| l.starts_with("modprobe ifb")).unwrap();
    assert!(last_unload < first_load);

    assert_eq!(lines.iter().filter(|l| *l == "modprobe ifb numifbs=2").count(), 2);
    assert!(lines.contains(&"tc filter add dev eth0 parent ffff: protocol all u32 match u32 0 0 action mirred egress redirect dev ifb0".to_string()));
    assert!(lines.contains(&"tc filter add dev eth1 parent ffff: protocol all u32 match u32 0 0 action mirred egress redirect dev ifb1".to_string()));
    assert!(lines.contains(&"tc qdisc add dev ifb1 parent 1:10 netem delay 20ms".to_string()));
}

#[test]
fn construction_failure_aborts_the_run() {
    let topology: Topology = r#"
[[interfaces.eth0.out]]
netem = "delay 10ms"
cidrs = ["10.0.0.1/32"]

[[interfaces.eth1.out]]
netem = "delay 20ms"
cidrs = ["10.0.0.2/32"]
"#
    .parse()
    .unwrap();

    let mut recorder = Recorder::new().fail_matching("dev eth0 parent 1:10 netem", "Error: Qdisc not found.");
    let err = topology.plan().unwrap().apply(&mut recorder).unwrap_err();

    match &err {
        Error::Command { command, source } => {
            assert_eq!(command.to_string(), "tc qdisc add dev eth0 parent 1:10 netem delay 10ms");
            assert!(source.to_string().contains("Error: Qdisc not found."));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let lines = recorder.lines();
    assert!(lines.last().unwrap().contains("netem delay 10ms"));
    assert!(lines.iter().all(|l| !l.contains("add dev eth1")));
}

#[test]
fn malformed_topology_issues_nothing() {
    let topology: Topology = r#"
[[interfaces.eth0.out]]
netem = "delay 10ms"
cidrs = ["10.0.0.1/32"]

[[interfaces.eth1.out]]
netem = "delay 20ms"
cidrs = ["not-an-address"]
"#
    .parse()
    .unwrap();

    assert!(matches!(topology.plan(), Err(Error::InvalidCidr { .. })));
}

#[test]
fn sample_topology_plans() {
    let topology: Topology = include_str!("../../../demos/topology.toml").parse().unwrap();
    let plan = topology.plan().unwrap();

    let mut recorder = Recorder::new();
    plan.apply(&mut recorder).unwrap();

    let lines = recorder.lines();
    assert!(lines.contains(
        &"tc filter add dev ifb0 protocol ipv6 parent 1: u32 match ip6 src fd00::/8 flowid 1:11"
            .to_string()
    ));
    assert!(lines.contains(
        &"tc filter add dev eth0 protocol ip parent 1: u32 match ip dst 172.16.0.0/12 flowid 1:11"
            .to_string()
    ));
}
