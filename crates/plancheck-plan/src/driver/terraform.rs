//! Live Terraform CLI driver.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

use crate::driver::PlanDriver;
use crate::error::PlanError;
use crate::model::Plan;
use crate::variables::VariableSet;

const VAR_FILE_NAME: &str = "terratest.tfvars.json";

/// Runs `terraform` against a private copy of a module directory.
///
/// Every plan gets its own temporary copy so parallel callers never share a
/// `.terraform` directory, lock file or plan file.
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
    module_dir: PathBuf,
    exclude: Vec<String>,
}

/// A staged copy of the module plus the files Terraform reads and writes.
#[derive(Debug)]
struct Workspace {
    // Held for its Drop: removes the copy.
    _root: TempDir,
    dir: PathBuf,
    var_file: PathBuf,
    plan_file: PathBuf,
}

impl TerraformCli {
    #[must_use]
    pub fn new(module_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: PathBuf::from("terraform"),
            module_dir: module_dir.into(),
            exclude: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Skip a top-level entry (e.g. `test`) when staging the module copy.
    #[must_use]
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude.push(name.into());
        self
    }

    #[must_use]
    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    fn stage(&self, vars: &VariableSet) -> Result<Workspace, PlanError> {
        let key = vars.cache_key().replace(':', "-");
        let root = tempfile::Builder::new()
            .prefix(&format!("plancheck-{key}-"))
            .tempdir()?;
        let dir = root.path().join("module");
        copy_module(&self.module_dir, &dir, &self.exclude)?;

        let var_file = dir.join(VAR_FILE_NAME);
        vars.write_var_file(&var_file)?;
        let plan_file = root.path().join(format!("testplan-{key}.tfplan"));

        Ok(Workspace {
            _root: root,
            dir,
            var_file,
            plan_file,
        })
    }

    fn init_and_plan(&self, ws: &Workspace) -> Result<Value, PlanError> {
        run_terraform(&self.binary, &ws.dir, &["init", "-input=false", "-no-color"])?;
        let var_arg = format!("-var-file={}", ws.var_file.display());
        let out_arg = format!("-out={}", ws.plan_file.display());
        run_terraform(
            &self.binary,
            &ws.dir,
            &["plan", "-input=false", "-no-color", "-lock=false", &var_arg, &out_arg],
        )?;
        let plan_path = ws.plan_file.display().to_string();
        let stdout = run_terraform(
            &self.binary,
            &ws.dir,
            &["show", "-json", "-no-color", &plan_path],
        )?;
        Ok(serde_json::from_str(&stdout)?)
    }

    /// Plan and then apply `vars` for real. `vars` must carry a `prefix`.
    ///
    /// The returned [`Deployment`] owns the working copy; call
    /// [`Deployment::destroy`] to tear the infrastructure down. Dropping it
    /// without doing so destroys it too.
    pub fn init_and_apply(&self, vars: &VariableSet) -> Result<Deployment, PlanError> {
        let prefix = vars.require_prefix()?;
        tracing::info!(%prefix, module = %self.module_dir.display(), "applying");
        let workspace = self.stage(vars)?;
        let plan = Plan::from_show_value(self.init_and_plan(&workspace)?)?;
        let plan_path = workspace.plan_file.display().to_string();
        run_terraform(
            &self.binary,
            &workspace.dir,
            &["apply", "-input=false", "-no-color", "-auto-approve", &plan_path],
        )?;
        Ok(Deployment {
            binary: self.binary.clone(),
            workspace,
            plan,
            destroyed: false,
        })
    }
}

impl PlanDriver for TerraformCli {
    fn show_json(&self, vars: &VariableSet) -> Result<Value, PlanError> {
        let workspace = self.stage(vars)?;
        self.init_and_plan(&workspace)
    }
}

/// Infrastructure created by [`TerraformCli::init_and_apply`].
#[derive(Debug)]
pub struct Deployment {
    binary: PathBuf,
    workspace: Workspace,
    plan: Plan,
    destroyed: bool,
}

impl Deployment {
    /// The plan that was applied.
    #[must_use]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.workspace.dir
    }

    /// Destroy the deployment, retrying once if the first destroy fails.
    pub fn destroy(mut self) -> Result<(), PlanError> {
        self.destroyed = true;
        self.destroy_twice()
    }

    fn destroy_twice(&self) -> Result<(), PlanError> {
        let var_arg = format!("-var-file={}", self.workspace.var_file.display());
        let args = [
            "destroy",
            "-input=false",
            "-no-color",
            "-auto-approve",
            var_arg.as_str(),
        ];
        if let Err(first) = run_terraform(&self.binary, &self.workspace.dir, &args) {
            tracing::warn!(error = %first, "destroy failed, retrying once");
            run_terraform(&self.binary, &self.workspace.dir, &args)?;
        }
        Ok(())
    }
}

impl Drop for Deployment {
    fn drop(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let dir = self.workspace.dir.display().to_string();
        tracing::warn!(%dir, "deployment dropped without destroy; destroying now");
        if let Err(e) = self.destroy_twice() {
            tracing::error!(%dir, error = %e, "destroy failed; cloud resources may remain");
        }
    }
}

fn run_terraform(binary: &Path, dir: &Path, args: &[&str]) -> Result<String, PlanError> {
    let command = format!("{} {}", binary.display(), args.join(" "));
    tracing::info!(%command, dir = %dir.display(), "running terraform");
    let output = Command::new(binary)
        .args(args)
        .current_dir(dir)
        .env("TF_IN_AUTOMATION", "1")
        .env("TF_INPUT", "0")
        .output()?;
    if !output.status.success() {
        return Err(PlanError::Tool {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Recursively copy a module, skipping hidden entries, state files and
/// top-level names listed in `exclude`.
fn copy_module(src: &Path, dst: &Path, exclude: &[String]) -> Result<(), PlanError> {
    copy_dir(src, dst, exclude, true)
}

fn copy_dir(src: &Path, dst: &Path, exclude: &[String], top: bool) -> Result<(), PlanError> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if skip_entry(&name) || (top && exclude.iter().any(|e| e == name.as_ref())) {
            continue;
        }
        let target = dst.join(name.as_ref());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target, exclude, false)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn skip_entry(name: &str) -> bool {
    name.starts_with('.') || name.ends_with(".tfstate") || name.ends_with(".tfstate.backup")
}
