//! Validation suites for the AKS Terraform configuration.
//!
//! The suites in `tests/` share one process-wide [`Suite`]: the harness
//! configuration read from the environment, the plan driver it selects, a
//! [`PlanCache`] so each variable set is planned once, and the optional JSONL
//! evidence log. By default plans are replayed from the recordings under
//! `tests/fixtures/plans`, so the suites run without Terraform or Azure.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use plancheck_harness::structured_log::LogSink;
use plancheck_harness::{CacheError, PlanCache, TestRunner};
use plancheck_plan::{HarnessConfig, Plan, PlanDriver, PlanError, TerraformCli, VariableSet};
use serde_json::json;

/// Planned resource addresses asserted by the suites.
pub mod addresses {
    pub const CLUSTER: &str = "module.aks.azurerm_kubernetes_cluster.aks";
    pub const USER_ASSIGNED_IDENTITY: &str = "azurerm_user_assigned_identity.uai[0]";
    pub const CLUSTER_ROLE_BINDING: &str = "module.kubeconfig.kubernetes_cluster_role_binding.kubernetes_crb[0]";
    pub const SERVICE_ACCOUNT: &str = "module.kubeconfig.kubernetes_service_account.kubernetes_sa[0]";
    pub const JUMP_VM: &str = "module.jump[0].azurerm_linux_virtual_machine.vm";
    pub const JUMP_PUBLIC_IP: &str = "module.jump[0].azurerm_public_ip.vm_ip[0]";
    pub const CONTAINER_REGISTRY: &str = "azurerm_container_registry.acr[0]";
    pub const RESOURCE_GROUP: &str = "azurerm_resource_group.aks_rg[0]";
    /// `{name}` is the node pool name.
    pub const NODE_POOL: &str =
        "module.node_pools[\"{name}\"].azurerm_kubernetes_cluster_node_pool.autoscale_node_pool[0]";
    /// `{name}` is the subnet name.
    pub const SUBNET: &str = "module.vnet[0].azurerm_subnet.subnet[\"{name}\"]";
    pub const NFS_VM: &str = "module.nfs[0].azurerm_linux_virtual_machine.vm";
    pub const NFS_PUBLIC_IP: &str = "module.nfs[0].azurerm_public_ip.vm_ip[0]";
    /// `{name}` is the RAID member index.
    pub const NFS_DATA_DISK: &str = "module.nfs[0].azurerm_managed_disk.vm_data_disk[{name}]";
    pub const NETAPP_ACCOUNT: &str = "module.netapp[0].azurerm_netapp_account.anf";
    pub const NETAPP_POOL: &str = "module.netapp[0].azurerm_netapp_pool.anf";
    pub const NETAPP_VOLUME: &str = "module.netapp[0].azurerm_netapp_volume.anf";
    pub const POSTGRES_SERVER: &str =
        "module.flex_postgresql[\"default\"].azurerm_postgresql_flexible_server.flexpsql";
    pub const POSTGRES_MAX_PREPARED_TRANSACTIONS: &str = "module.flex_postgresql[\"default\"]\
        .azurerm_postgresql_flexible_server_configuration.flexpsql[\"max_prepared_transactions\"]";
}

/// Variable file every scenario starts from, relative to the workspace root.
pub const DEFAULT_VAR_FILE: &str = "tests/fixtures/sample-input-defaults.tfvars.json";

/// Prefix of the default-configuration plan.
pub const DEFAULT_PREFIX: &str = "default";
pub const DEFAULT_LOCATION: &str = "eastus";
pub const DEFAULT_PUBLIC_ACCESS_CIDR: &str = "123.45.67.89/16";

/// Suite name stamped on evidence log trace ids.
const LOG_SUITE: &str = "aks";

#[must_use]
pub fn workspace_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .ancestors()
        .nth(2)
        .map_or_else(|| manifest.to_path_buf(), Path::to_path_buf)
}

fn from_workspace(path: &Path) -> PathBuf {
    if path.is_relative() {
        workspace_root().join(path)
    } else {
        path.to_path_buf()
    }
}

/// Shared state for every suite in the process.
pub struct Suite {
    config: HarnessConfig,
    driver: Box<dyn PlanDriver>,
    cache: PlanCache,
    log: Option<Arc<LogSink>>,
}

impl Suite {
    /// Build from `config`; relative fixture and log paths are taken from the
    /// workspace root.
    pub fn from_config(mut config: HarnessConfig) -> Result<Self, PlanError> {
        config.fixture_dir = from_workspace(&config.fixture_dir);
        config.log_path = config.log_path.as_deref().map(from_workspace);

        let driver = config.driver()?;
        let log = match &config.log_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Some(Arc::new(LogSink::to_file(path, LOG_SUITE, &LogSink::run_id_now())?))
            }
            None => None,
        };
        tracing::info!(
            mode = config.mode.as_str(),
            fixtures = %config.fixture_dir.display(),
            "suite configured"
        );
        Ok(Self {
            config,
            driver,
            cache: PlanCache::new(),
            log,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Plan `vars`, at most once per prefix for the life of the process.
    pub fn plan(&self, vars: &VariableSet) -> Result<Arc<Plan>, CacheError> {
        self.cache.plan(&self.driver, vars)
    }

    /// Cache keys whose plan attempt has finished, successfully or not.
    #[must_use]
    pub fn planned_keys(&self) -> Vec<String> {
        self.cache.completed_keys()
    }

    /// A runner that writes to the evidence log when one is configured.
    #[must_use]
    pub fn runner(&self, name: &str) -> TestRunner {
        let runner = TestRunner::new(name);
        match &self.log {
            Some(log) => runner.with_log(Arc::clone(log)),
            None => runner,
        }
    }

    /// Terraform for apply suites; fails unless a module directory is set.
    pub fn terraform(&self) -> Result<TerraformCli, PlanError> {
        self.config.terraform()
    }
}

static SUITE: OnceLock<Result<Suite, PlanError>> = OnceLock::new();

/// The process-wide suite, configured from the environment on first use.
pub fn suite() -> Result<&'static Suite, &'static PlanError> {
    SUITE
        .get_or_init(|| HarnessConfig::from_env().and_then(Suite::from_config))
        .as_ref()
}

/// Variables of the default configuration: the sample input file with the
/// `default` prefix, the `eastus` region and a fixed public access CIDR.
pub fn default_plan_vars() -> Result<VariableSet, PlanError> {
    let mut vars = VariableSet::from_var_file(&workspace_root().join(DEFAULT_VAR_FILE))?;
    vars.set("prefix", DEFAULT_PREFIX)
        .set("location", DEFAULT_LOCATION)
        .set("default_public_access_cidrs", json!([DEFAULT_PUBLIC_ACCESS_CIDR]));
    Ok(vars)
}

/// Default variables under another prefix, for scenarios that change them.
pub fn scenario_vars(prefix: &str) -> Result<VariableSet, PlanError> {
    Ok(default_plan_vars()?.with("prefix", prefix))
}

/// Key a batch of cases by name.
pub fn named<T>(cases: impl IntoIterator<Item = (&'static str, T)>) -> HashMap<String, T> {
    cases
        .into_iter()
        .map(|(name, case)| (name.to_string(), case))
        .collect()
}
