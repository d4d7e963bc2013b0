//! `init`: create a project from a template
//!
//! 1. Load the template catalogue
//! 2. Check the target directory, asking before touching a non-empty one
//! 3. Collect project metadata
//! 4. Download (or update) the template package in the template cache
//! 5. Install it: normal templates are copied, rendered and get their
//!    dependencies installed; custom templates run their own entry point

pub mod project;
pub mod render;
pub mod template;
pub mod workspace;

pub use project::{ProjectInfo, ProjectType};
pub use template::{TemplateInfo, TemplateKind};

use crate::config::Config;
use crate::dispatch::{ExecutionRequest, Invocation};
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::package::{Installer, Package, PackageSpec, TarballInstaller};
use crate::paths::format_path;
use crate::registry::{HttpRegistry, Registry};
use crate::runner::Command;
use crate::ui::{self, TaskSpinner, UiContext};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Programs a template may use as its install command
pub const INSTALL_COMMANDS: &[&str] = &["npm", "cnpm"];

/// Directory inside a template package holding the project files
const TEMPLATE_SUBDIR: &str = "template";

/// Split an install command and check its program against
/// [`INSTALL_COMMANDS`]
pub fn parse_install_command(command: &str) -> ScaffoldResult<(String, Vec<String>)> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| ScaffoldError::User("Install command is empty".to_string()))?;

    if !INSTALL_COMMANDS.contains(&program) {
        return Err(ScaffoldError::User(format!(
            "Install command not allowed: {} (allowed: {})",
            program,
            INSTALL_COMMANDS.join(", ")
        )));
    }

    Ok((program.to_string(), parts.map(str::to_string).collect()))
}

/// The `init` command
pub struct InitCommand {
    config: Config,
    ctx: UiContext,
    target_dir: PathBuf,
    registry: Arc<dyn Registry>,
    installer: Arc<dyn Installer>,
    templates: Option<Vec<TemplateInfo>>,
    project_name: Option<String>,
    force: bool,
}

impl InitCommand {
    /// Command creating the project in `target_dir`, using the configured
    /// registry
    pub fn new(config: &Config, ctx: UiContext, target_dir: PathBuf) -> Self {
        let registry = Arc::new(HttpRegistry::new(&config.registry));
        let installer = Arc::new(TarballInstaller::new(registry.clone()));
        Self::with_backends(config, ctx, target_dir, registry, installer)
    }

    pub fn with_backends(
        config: &Config,
        ctx: UiContext,
        target_dir: PathBuf,
        registry: Arc<dyn Registry>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            config: config.clone(),
            ctx,
            target_dir,
            registry,
            installer,
            templates: None,
            project_name: None,
            force: false,
        }
    }

    /// Use a fixed template catalogue instead of loading one
    pub fn with_templates(mut self, templates: Vec<TemplateInfo>) -> Self {
        self.templates = Some(templates);
        self
    }

    async fn load_templates(&mut self) -> ScaffoldResult<Vec<TemplateInfo>> {
        let templates = match self.templates.take() {
            Some(templates) => templates,
            None => template::fetch_templates(&self.config.templates).await?,
        };
        if templates.is_empty() {
            return Err(ScaffoldError::TemplateNotFound(
                "no project templates available".to_string(),
            ));
        }
        Ok(templates)
    }

    /// Check the target directory and collect project metadata.
    ///
    /// `None` when the user declines to continue.
    async fn prepare(
        &self,
        templates: &[TemplateInfo],
    ) -> ScaffoldResult<Option<(ProjectInfo, usize)>> {
        debug!("Target directory: {}", self.target_dir.display());

        if !workspace::is_dir_empty(&self.target_dir)? {
            if !self.force {
                let proceed = ui::confirm(
                    &self.ctx,
                    "The current directory is not empty. Continue creating the project?",
                    false,
                )
                .await?;
                if !proceed {
                    return Ok(None);
                }
            }

            let wipe = ui::confirm(
                &self.ctx,
                "Remove all files in the current directory?",
                false,
            )
            .await?;
            if wipe {
                workspace::empty_dir(&self.target_dir)?;
                ui::step_ok(&self.ctx, "Directory emptied");
            } else {
                ui::step_warn(&self.ctx, "Existing files are kept; template files overwrite them");
            }
        }

        let answers =
            project::prompt_project_info(&self.ctx, templates, self.project_name.as_deref()).await?;
        Ok(Some(answers))
    }

    /// Bring the template package into the template cache
    async fn download_template(&self, template: &TemplateInfo) -> ScaffoldResult<Package> {
        let mut package = Package::cached(
            PackageSpec::new(&template.name, &template.version),
            Config::store_dir(&self.config.template_dir()),
            self.registry.clone(),
            self.installer.clone(),
        );

        let mut spinner = TaskSpinner::new(&self.ctx);
        let result = if package.exists().await? {
            spinner.start("Updating template...");
            package.update().await
        } else {
            spinner.start("Downloading template...");
            package.install().await
        };

        match result {
            Ok(()) => {
                spinner.stop(&format!("Template ready ({})", package.spec()));
                Ok(package)
            }
            Err(e) => {
                spinner.stop_error("Template download failed");
                Err(e)
            }
        }
    }

    async fn install_normal(
        &self,
        template: &TemplateInfo,
        package: &Package,
        info: &ProjectInfo,
    ) -> ScaffoldResult<()> {
        debug!("Installing normal template {}", package.spec());
        let source = package.cache_file_path().join(TEMPLATE_SUBDIR);
        let target = self.target_dir.clone();

        let mut spinner = TaskSpinner::new(&self.ctx);
        spinner.start("Copying template...");
        let copied = tokio::task::spawn_blocking(move || workspace::copy_dir(&source, &target))
            .await
            .map_err(|e| ScaffoldError::User(format!("Copy task failed: {}", e)))?;
        match copied {
            Ok(count) => spinner.stop(&format!("Template copied ({} files)", count)),
            Err(e) => {
                spinner.stop_error("Template copy failed");
                return Err(e);
            }
        }

        let rendered =
            render::render_tree(&self.target_dir, &template.ignore, info.context()).await?;
        ui::step_ok_detail(&self.ctx, "Template rendered", &format!("{} files", rendered));

        self.run_install_command(template.install_command.as_deref())
            .await
    }

    async fn run_install_command(&self, command: Option<&str>) -> ScaffoldResult<()> {
        let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
            ui::remark(&self.ctx, "Template declares no install command");
            return Ok(());
        };

        let (program, args) = parse_install_command(command)?;
        ui::step_info(&self.ctx, &format!("Running {}", command));

        let code = Invocation::new(program, args)
            .current_dir(&self.target_dir)
            .run(None)
            .await?;
        if code != 0 {
            return Err(ScaffoldError::CommandFailed {
                command: command.to_string(),
                code,
            });
        }

        ui::step_ok(&self.ctx, "Dependencies installed");
        Ok(())
    }

    async fn install_custom(
        &self,
        template: &TemplateInfo,
        package: &Package,
        info: &ProjectInfo,
    ) -> ScaffoldResult<()> {
        debug!("Installing custom template {}", package.spec());
        let entry = package
            .root_file_path()?
            .filter(|entry| entry.is_file())
            .ok_or_else(|| ScaffoldError::EntryNotFound {
                package: package.spec().to_string(),
                path: package.cache_file_path(),
            })?;
        debug!("Custom template entry: {}", entry.display());

        let mut options = Map::new();
        options.insert(
            "targetPath".to_string(),
            Value::String(format_path(&self.target_dir)),
        );
        options.insert(
            "sourcePath".to_string(),
            Value::String(format_path(package.cache_file_path().join(TEMPLATE_SUBDIR))),
        );
        options.insert("templateInfo".to_string(), serde_json::to_value(template)?);
        options.insert("projectInfo".to_string(), serde_json::to_value(info)?);

        let request = ExecutionRequest::new(self.name(), Vec::new(), options);
        let request_file = request.write_temp()?;

        ui::step_info(&self.ctx, "Running custom template installer");
        let invocation =
            Invocation::plan(&entry, request_file.path()).current_dir(&self.target_dir);
        let code = invocation.run(Some(request_file.path())).await?;
        if code != 0 {
            return Err(ScaffoldError::CommandFailed {
                command: invocation.to_string(),
                code,
            });
        }

        ui::step_ok(&self.ctx, "Custom template installed");
        Ok(())
    }
}

#[async_trait(?Send)]
impl Command for InitCommand {
    fn name(&self) -> &str {
        "init"
    }

    async fn init(&mut self, args: &[String], options: &Map<String, Value>) -> ScaffoldResult<()> {
        self.project_name = args.first().filter(|name| !name.is_empty()).cloned();
        self.force = options
            .get("force")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        debug!(
            "init: project name {:?}, force {}",
            self.project_name, self.force
        );
        Ok(())
    }

    async fn exec(&mut self) -> ScaffoldResult<()> {
        ui::intro(&self.ctx, "Create project");

        let templates = self.load_templates().await?;
        let Some((info, index)) = self.prepare(&templates).await? else {
            ui::outro_warn(&self.ctx, "Project creation cancelled");
            return Ok(());
        };

        let template = &templates[index];
        let kind = template.kind()?;
        ui::step_info(
            &self.ctx,
            &format!("Using {} template {}@{}", kind, template.name, template.version),
        );

        let package = self.download_template(template).await?;
        match kind {
            TemplateKind::Normal => self.install_normal(template, &package, &info).await?,
            TemplateKind::Custom => self.install_custom(template, &package, &info).await?,
        }

        ui::outro_success(
            &self.ctx,
            &format!(
                "Created {} in {}",
                info.project_name,
                format_path(&self.target_dir)
            ),
        );
        Ok(())
    }
}
