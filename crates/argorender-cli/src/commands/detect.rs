//! Detect command - show how each source would be rendered

use std::path::Path;

use argorender_engine::{RenderRequest, Renderer};
use clap::Args;

use super::{load_config, run_cancellable, AppArgs};
use crate::display;
use crate::error::Result;

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[command(flatten)]
    pub app: AppArgs,
}

pub async fn run(args: DetectArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;

    let application = args.app.load_application()?;
    let repo_root = args.app.repo_root()?;

    // Remote charts are pulled to detect them, so honor the cache settings
    let mut request = RenderRequest::new(application, repo_root);
    request.options.chart_cache_dir = config.chart_cache_dir.clone();
    if let Some(helm) = &config.helm_binary {
        request.options.helm.binary = helm.clone();
    }

    let detected = run_cancellable(Renderer::new().detect(&request), config.timeout).await?;
    for source in &detected {
        println!("{}", display::format_detected(source));
    }
    Ok(())
}
