//! Process graph construction.
//!
//! # Design
//! - The graph is an explicit name → descriptor map; several instances merge
//!   into one document without shared state.
//! - The server's only dependency is its init process with
//!   `process_completed_successfully`; caller-supplied edges attach to the
//!   init process.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use pgdev_config::defaults::SHUTDOWN_SIGNAL;
use pgdev_config::{DependencyCondition, DependencyEdge, PostgresConfig, ProbeConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::InstanceCommands;
use crate::descriptor::{Availability, ProcessDescriptor, ReadinessProbe, Shutdown};
use crate::error::{ProcessError, ProcessResult};

/// Everything needed to describe one instance's processes.
#[derive(Debug, Clone)]
pub struct GraphInputs {
    /// Instance name; namespace and process-name prefix.
    pub name: String,
    /// Init process command line.
    pub init_command: String,
    /// Server process command line.
    pub main_command: String,
    /// Readiness check command line.
    pub readiness_command: String,
    /// Probe timings and restart budget.
    pub probe: ProbeConfig,
    /// Extra edges for the init process.
    pub extra_deps: BTreeMap<String, DependencyEdge>,
}

impl GraphInputs {
    /// Inputs derived from `config` and its assembled commands.
    #[must_use]
    pub fn from_config(config: &PostgresConfig, commands: InstanceCommands) -> Self {
        Self {
            name: config.name.clone(),
            init_command: commands.init,
            main_command: commands.main,
            readiness_command: commands.readiness,
            probe: config.probe,
            extra_deps: config.depends_on.clone(),
        }
    }

    fn init_name(&self) -> String {
        format!("{}-init", self.name)
    }
}

/// Name → descriptor map handed to the supervisor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessGraph {
    processes: BTreeMap<String, ProcessDescriptor>,
}

impl ProcessGraph {
    /// Empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-process graph for one instance.
    #[must_use]
    pub fn build(inputs: &GraphInputs) -> Self {
        let init_name = inputs.init_name();
        let init = ProcessDescriptor {
            command: inputs.init_command.clone(),
            depends_on: inputs.extra_deps.clone(),
            readiness_probe: None,
            availability: Availability::once(),
            shutdown: None,
            namespace: inputs.name.clone(),
        };
        let main = ProcessDescriptor {
            command: inputs.main_command.clone(),
            depends_on: BTreeMap::from([(
                init_name.clone(),
                DependencyEdge::from(DependencyCondition::ProcessCompletedSuccessfully),
            )]),
            readiness_probe: Some(ReadinessProbe::exec(
                inputs.readiness_command.clone(),
                &inputs.probe,
            )),
            availability: Availability::on_failure(inputs.probe.max_restarts),
            shutdown: Some(Shutdown {
                signal: SHUTDOWN_SIGNAL,
            }),
            namespace: inputs.name.clone(),
        };
        debug!(instance = %inputs.name, "built process graph");
        Self {
            processes: BTreeMap::from([(init_name, init), (inputs.name.clone(), main)]),
        }
    }

    /// Add every process of `other`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::DuplicateProcess`] when a name already exists;
    /// `self` is left unchanged in that case.
    pub fn merge(&mut self, other: Self) -> ProcessResult<()> {
        if let Some(name) = other
            .processes
            .keys()
            .find(|name| self.processes.contains_key(*name))
        {
            return Err(ProcessError::DuplicateProcess { name: name.clone() });
        }
        self.processes.extend(other.processes);
        Ok(())
    }

    /// Look up a descriptor by process name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProcessDescriptor> {
        self.processes.get(name)
    }

    /// Process names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.processes.keys().map(String::as_str)
    }

    /// Number of processes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    /// Whether the graph has no processes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Dependency targets not defined in this graph. The supervisor document
    /// may define them elsewhere, so they are reported rather than rejected.
    #[must_use]
    pub fn external_dependencies(&self) -> BTreeSet<&str> {
        self.processes
            .values()
            .flat_map(|descriptor| descriptor.depends_on.keys())
            .filter(|name| !self.processes.contains_key(*name))
            .map(String::as_str)
            .collect()
    }

    /// Pretty JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Serialize`] if serialisation fails.
    pub fn to_json_pretty(&self) -> ProcessResult<String> {
        serde_json::to_string_pretty(self).map_err(|source| ProcessError::Serialize { source })
    }

    /// Write the JSON document to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError::Serialize`] or [`ProcessError::Io`].
    pub fn write_to(&self, path: &Path) -> ProcessResult<()> {
        let mut document = self.to_json_pretty()?;
        document.push('\n');
        fs::write(path, document).map_err(|source| ProcessError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RestartPolicy;
    use serde_json::json;

    fn inputs(name: &str) -> GraphInputs {
        GraphInputs {
            name: name.to_string(),
            init_command: format!("pgdev setup --config {name}.json"),
            main_command: format!("postgres -D data/{name}"),
            readiness_command: "pg_isready -h /tmp -p 5432 -d template1".into(),
            probe: ProbeConfig::default(),
            extra_deps: BTreeMap::new(),
        }
    }

    #[test]
    fn main_depends_only_on_init_completing_successfully() {
        let graph = ProcessGraph::build(&inputs("pg1"));
        let main = graph.get("pg1").expect("main process");
        assert_eq!(main.depends_on.len(), 1);
        assert_eq!(
            main.depends_on["pg1-init"].condition,
            DependencyCondition::ProcessCompletedSuccessfully
        );
        assert_eq!(main.availability.restart, RestartPolicy::OnFailure);
        assert_eq!(main.availability.max_restarts, Some(5));
        assert_eq!(main.shutdown, Some(Shutdown { signal: 2 }));
        assert_eq!(main.namespace, "pg1");
        assert!(main.readiness_probe.is_some());
    }

    #[test]
    fn extra_deps_attach_to_init_only() {
        let mut with_deps = inputs("pg1");
        with_deps.extra_deps.insert(
            "minio".into(),
            DependencyEdge::from(DependencyCondition::ProcessHealthy),
        );
        let graph = ProcessGraph::build(&with_deps);

        let init = graph.get("pg1-init").expect("init process");
        assert_eq!(
            init.depends_on["minio"].condition,
            DependencyCondition::ProcessHealthy
        );
        assert_eq!(init.availability.restart, RestartPolicy::No);
        assert!(init.readiness_probe.is_none());

        let main = graph.get("pg1").expect("main process");
        assert_eq!(main.depends_on.len(), 1);
        assert_eq!(graph.external_dependencies(), BTreeSet::from(["minio"]));
    }

    #[test]
    fn instances_merge_and_collisions_fail() {
        let mut graph = ProcessGraph::build(&inputs("pg1"));
        graph
            .merge(ProcessGraph::build(&inputs("pg2")))
            .expect("distinct names merge");
        assert_eq!(
            graph.names().collect::<Vec<_>>(),
            vec!["pg1", "pg1-init", "pg2", "pg2-init"]
        );

        let err = graph
            .merge(ProcessGraph::build(&inputs("pg2")))
            .unwrap_err();
        assert!(matches!(err, ProcessError::DuplicateProcess { name } if name == "pg2"));
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn document_shape_matches_supervisor_format() {
        let graph = ProcessGraph::build(&inputs("pg1"));
        let value = serde_json::to_value(&graph).expect("serialise");
        assert_eq!(
            value["processes"]["pg1"]["depends_on"],
            json!({"pg1-init": {"condition": "process_completed_successfully"}})
        );
        assert_eq!(
            value["processes"]["pg1"]["readiness_probe"],
            json!({
                "exec": {"command": "pg_isready -h /tmp -p 5432 -d template1"},
                "initial_delay_seconds": 2,
                "period_seconds": 10,
                "timeout_seconds": 4,
                "success_threshold": 1,
                "failure_threshold": 5
            })
        );
        assert!(value["processes"]["pg1-init"].get("depends_on").is_none());
    }

    #[test]
    fn write_to_emits_pretty_json() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("process-compose.json");
        let graph = ProcessGraph::build(&inputs("pg1"));
        graph.write_to(&path)?;
        let parsed: ProcessGraph = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(parsed, graph);
        Ok(())
    }
}
