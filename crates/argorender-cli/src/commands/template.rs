//! Template command - render an Application locally

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use argorender_core::{ByteSize, Config, KubeVersion, ResourceObject};
use argorender_engine::{RenderOptions, RenderRequest, Renderer, DEFAULT_TRACKING_LABEL};
use clap::{Args, ValueEnum};

use super::{load_config, run_cancellable, AppArgs};
use crate::display;
use crate::error::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML documents separated by `---`
    Yaml,
    /// A single JSON array
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// Kubernetes version passed to helm (e.g. 1.29 or v1.29.0)
    #[arg(long, env = "ARGORENDER_KUBE_VERSION")]
    pub kube_version: Option<String>,

    /// Pass --skip-crds to helm template
    #[arg(long)]
    pub helm_skip_crds: bool,

    /// Pass --skip-tests to helm template
    #[arg(long)]
    pub helm_skip_tests: bool,

    /// Extra flags for kustomize build
    #[arg(
        long,
        env = "ARGORENDER_KUSTOMIZE_BUILD_OPTIONS",
        allow_hyphen_values = true
    )]
    pub kustomize_build_options: Option<String>,

    /// helm executable
    #[arg(long, env = "ARGORENDER_HELM_BINARY")]
    pub helm_binary: Option<PathBuf>,

    /// kustomize executable
    #[arg(long, env = "ARGORENDER_KUSTOMIZE_BINARY")]
    pub kustomize_binary: Option<PathBuf>,

    /// Upper bound for rendered output (e.g. 10Mi)
    #[arg(long, env = "ARGORENDER_MAX_MANIFEST_SIZE")]
    pub max_manifest_size: Option<String>,

    /// Label set to the Application name on every object
    #[arg(long, env = "ARGORENDER_APP_LABEL_KEY")]
    pub app_label_key: Option<String>,

    /// Do not add the tracking label
    #[arg(long)]
    pub no_tracking_label: bool,

    /// Directory for pulled remote charts
    #[arg(long, env = "ARGORENDER_CHART_CACHE_DIR")]
    pub chart_cache_dir: Option<PathBuf>,

    /// Abort the render after this long (e.g. 30s, 2m)
    #[arg(long, env = "ARGORENDER_TIMEOUT", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "yaml")]
    pub output: OutputFormat,
}

fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(input).map_err(|e| e.to_string())
}

impl TemplateArgs {
    /// Merge flags (and their env vars) over the config file
    pub fn render_options(&self, config: &Config) -> Result<RenderOptions> {
        let mut options = RenderOptions::default();

        options.kube_version = match &self.kube_version {
            Some(v) => Some(v.parse::<KubeVersion>().map_err(|e| {
                CliError::config_with_help(e.to_string(), "use a version like 1.29 or v1.29.0")
            })?),
            None => config.kube_version()?,
        };

        options.max_manifest_size = match &self.max_manifest_size {
            Some(size) => size.parse::<ByteSize>().map_err(|e| {
                CliError::config_with_help(e.to_string(), "use a size like 512Ki, 10Mi or 1G")
            })?,
            None => config
                .max_manifest_size()?
                .unwrap_or(options.max_manifest_size),
        };

        if let Some(binary) = self.helm_binary.clone().or_else(|| config.helm_binary.clone()) {
            options.helm.binary = binary;
        }
        options.helm.skip_crds = self.helm_skip_crds;
        options.helm.skip_tests = self.helm_skip_tests;

        if let Some(binary) = self
            .kustomize_binary
            .clone()
            .or_else(|| config.kustomize_binary.clone())
        {
            options.kustomize.binary = binary;
        }
        options.kustomize.build_options = self
            .kustomize_build_options
            .clone()
            .or_else(|| config.kustomize_build_options.clone());

        options.tracking_label = if self.no_tracking_label {
            None
        } else {
            Some(
                self.app_label_key
                    .clone()
                    .or_else(|| config.app_label_key.clone())
                    .unwrap_or_else(|| DEFAULT_TRACKING_LABEL.to_string()),
            )
        };

        options.chart_cache_dir = self
            .chart_cache_dir
            .clone()
            .or_else(|| config.chart_cache_dir.clone());

        Ok(options)
    }
}

pub async fn run(args: TemplateArgs, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let options = args.render_options(&config)?;
    let timeout = args.timeout.or(config.timeout);

    let application = args.app.load_application()?;
    let repo_root = args.app.repo_root()?;
    tracing::debug!(
        app = application.name(),
        repo = %repo_root.display(),
        "rendering application"
    );

    let request = RenderRequest::new(application, repo_root).with_options(options);
    let renderer = Renderer::new();
    let output = run_cancellable(renderer.render(&request), timeout).await?;

    display::display_warnings(&output.warnings);

    let rendered = match args.output {
        OutputFormat::Yaml => to_yaml_stream(&output.objects)?,
        OutputFormat::Json => to_json_array(&output.objects)?,
    };

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rendered.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(CliError::output)?;

    Ok(())
}

/// YAML documents separated by `---`
pub fn to_yaml_stream(objects: &[ResourceObject]) -> Result<String> {
    let mut out = String::new();
    for (i, obj) in objects.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&obj.to_yaml().map_err(CliError::output)?);
    }
    Ok(out)
}

pub fn to_json_array(objects: &[ResourceObject]) -> Result<String> {
    let manifests: Vec<_> = objects.iter().map(ResourceObject::manifest).collect();
    let mut json = serde_json::to_string_pretty(&manifests).map_err(CliError::output)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: TemplateArgs,
    }

    fn parse(args: &[&str]) -> TemplateArgs {
        let mut argv = vec!["argorender"];
        argv.extend_from_slice(args);
        Harness::parse_from(argv).args
    }

    fn objects() -> Vec<ResourceObject> {
        vec![
            ResourceObject::from_yaml("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n", 0)
                .unwrap(),
            ResourceObject::from_yaml("apiVersion: v1\nkind: Secret\nmetadata:\n  name: b\n", 0)
                .unwrap(),
        ]
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            helm_binary: Some(PathBuf::from("/opt/helm")),
            kube_version: Some("1.28".to_string()),
            app_label_key: Some("team/app".to_string()),
            max_manifest_size: Some("1Mi".to_string()),
            ..Default::default()
        };
        let args = parse(&["--kube-version", "v1.30", "--helm-skip-crds"]);
        let options = args.render_options(&config).unwrap();

        assert_eq!(options.kube_version.unwrap().to_helm_arg(), "v1.30.0");
        assert_eq!(options.helm.binary, PathBuf::from("/opt/helm"));
        assert!(options.helm.skip_crds);
        assert!(!options.helm.skip_tests);
        assert_eq!(options.tracking_label.as_deref(), Some("team/app"));
        assert_eq!(options.max_manifest_size.bytes(), 1024 * 1024);
    }

    #[test]
    fn test_defaults() {
        let options = parse(&[]).render_options(&Config::default()).unwrap();
        assert!(options.kube_version.is_none());
        assert_eq!(options.helm.binary, PathBuf::from("helm"));
        assert_eq!(options.tracking_label.as_deref(), Some(DEFAULT_TRACKING_LABEL));
        assert_eq!(options.max_manifest_size, argorender_core::DEFAULT_MAX_MANIFEST_SIZE);
    }

    #[test]
    fn test_no_tracking_label() {
        let options = parse(&["--no-tracking-label"])
            .render_options(&Config::default())
            .unwrap();
        assert!(options.tracking_label.is_none());
    }

    #[test]
    fn test_build_options_with_leading_dashes() {
        let args = parse(&["--kustomize-build-options", "--enable-helm --load-restrictor LoadRestrictionsNone"]);
        let options = args.render_options(&Config::default()).unwrap();
        assert_eq!(
            options.kustomize.build_flags(),
            vec!["--enable-helm", "--load-restrictor", "LoadRestrictionsNone"]
        );
    }

    #[test]
    fn test_invalid_kube_version() {
        let err = parse(&["--kube-version", "latest"])
            .render_options(&Config::default())
            .unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn test_timeout_flag() {
        let args = parse(&["--timeout", "1m 30s"]);
        assert_eq!(args.timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_yaml_stream() {
        let yaml = to_yaml_stream(&objects()).unwrap();
        let docs: Vec<&str> = yaml.split("---\n").collect();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("kind: ConfigMap"));
        assert!(docs[1].contains("kind: Secret"));
        assert_eq!(to_yaml_stream(&[]).unwrap(), "");
    }

    #[test]
    fn test_json_array() {
        let json = to_json_array(&objects()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["kind"], "Secret");
    }
}
