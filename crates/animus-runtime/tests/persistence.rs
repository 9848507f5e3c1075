//! Writing samples of a running system to disk.

use animus_runtime::prelude::*;
use std::fs;

fn hive() -> ManagementSystem {
    let mut agents = Vec::new();
    for (name, energy) in [("ant", 3.0), ("bee", 8.0)] {
        let mut agent = Agent::new(name);
        agent
            .set_resource(Array::resource("stock", ["energy"]).unwrap().with_values([energy]).unwrap())
            .unwrap();
        agents.push(agent);
    }
    let mut rng = rng_from_seed(Some(13));
    let mut system = SystemBuilder::new("hive")
        .seed(13)
        .with_graph(AgentGraph::path(3, &mut rng))
        .with_agents(agents)
        .build()
        .unwrap();
    let last = system.graph().node_ids()[2];
    system.node_aux_mut(last).unwrap().insert("nectar".into(), Value::from(4));
    system
}

#[test]
fn rules_fire_on_their_stride() {
    let dir = tempfile::tempdir().unwrap();
    let persister = Persister::new(dir.path().join("out"))
        .with_rule(WriteRule::new("agents_{}", AgentSampler::new(), 2, "to_csv").unwrap())
        .with_rule(WriteRule::new("graph", GraphSampler::new(), 3, "write_edgelist").unwrap());
    let system = hive();

    assert_eq!(persister.persist(&system, 1).unwrap().len(), 0);
    assert!(!dir.path().join("out").exists());

    let written = persister.persist(&system, 6).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("agents_6.csv"));
    assert!(written[1].ends_with("graph_6.edgelist"));

    let csv = fs::read_to_string(&written[0]).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("generation,agent,agent_id,path,value"));
    let ids = system.agent_ids();
    assert_eq!(lines.next(), Some(format!("6,ant,{},resource:energy,3", ids[0]).as_str()));
    assert_eq!(lines.next(), Some(format!("6,bee,{},resource:energy,8", ids[1]).as_str()));

    let edges = fs::read_to_string(&written[1]).unwrap();
    assert_eq!(edges.lines().count(), 2);
    assert!(edges.contains("unoccupied_0"));
}

#[test]
fn json_and_dot_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let persister = Persister::new(dir.path())
        .with_rule(
            WriteRule::new("env", EnvironmentSampler::new(), 1, "to_json")
                .unwrap()
                .with_kwarg("pretty", true),
        )
        .with_rule(WriteRule::new("env_lines", EnvironmentSampler::new(), 1, "to_jsonl").unwrap())
        .with_rule(WriteRule::new("net", GraphSampler::new(), 1, "write_dot").unwrap());
    let system = hive();

    let written = persister.persist(&system, 0).unwrap();
    assert_eq!(written.len(), 3);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["attribute"], "nectar");
    assert_eq!(records[0]["value"], 4);

    let lines = fs::read_to_string(&written[1]).unwrap();
    assert_eq!(lines.lines().count(), 1);

    let dot = fs::read_to_string(&written[2]).unwrap();
    assert!(dot.starts_with("graph {"));
    assert_eq!(dot.matches(" -- ").count(), 2);
}

#[test]
fn persister_builds_from_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sim.toml");
    fs::write(
        &config_path,
        format!(
            r#"
            [system]
            name = "hive"
            seed = 13

            [sampling]
            output_dir = "{}"

            [[sampling.rules]]
            stem = "agents"
            sampler = "agent"
            stride = 5
            serializer = "to_csv"
            kwargs = {{ sep = ";" }}
            "#,
            dir.path().join("samples").display()
        ),
    )
    .unwrap();

    let config = SimulationConfig::from_file(&config_path).unwrap();
    let persister = Persister::from_config(&config.sampling).unwrap();
    let system = ManagementSystem::from_config(config.system, Vec::new()).unwrap();
    assert_eq!(system.name(), "hive");

    let written = persister.persist(&hive(), 10).unwrap();
    assert_eq!(written.len(), 1);
    let csv = fs::read_to_string(&written[0]).unwrap();
    assert!(csv.starts_with("generation;agent;agent_id;path;value\n"));
    assert!(written[0].ends_with("agents_10.csv"));
}

#[test]
fn mismatched_configuration_is_rejected() {
    let config = SimulationConfig::from_toml_str(
        r#"
        [[sampling.rules]]
        stem = "agents"
        sampler = "graph"
        serializer = "to_json"
        "#,
    )
    .unwrap();
    assert!(matches!(
        Persister::from_config(&config.sampling),
        Err(PersistError::Incompatible { .. })
    ));
}
