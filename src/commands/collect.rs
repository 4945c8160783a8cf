use crate::output::{output_graph, print_info, print_success, print_warning};
use nutanix_collector::config::CollectorConfig;
use nutanix_collector::graph::Graph;
use nutanix_collector::NutanixCollectorPlugin;
use std::path::{Path, PathBuf};

pub fn handle_collect_command(
    config: Option<&Path>,
    format: &str,
    disable: &[String],
    post: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve_config_path(config)?;
    let mut config = CollectorConfig::load(&path)?;
    config.disable(disable);

    if config.credentials.is_empty() {
        print_warning(&format!("No Prism Central credentials in {}", path.display()));
    }

    let plugin = NutanixCollectorPlugin::new(config);
    let run = plugin.collect();

    for failure in &run.failures {
        let scope = match &failure.element {
            Some(element) => format!("{} / {}", failure.account, element),
            None => failure.account.clone(),
        };
        print_warning(&format!("{} [{}]: {}", scope, failure.collector, failure.error));
    }

    match post {
        Some(url) => post_graph(&run.graph, url)?,
        None => output_graph(&run.graph, format)?,
    }

    if !run.is_complete() {
        print_info(&format!(
            "Collection finished with {} failure(s); the graph is partial",
            run.failures.len()
        ));
    }
    Ok(())
}

pub fn resolve_config_path(config: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match config {
        Some(path) => Ok(path.to_path_buf()),
        None => CollectorConfig::default_path()
            .ok_or_else(|| "Could not determine the config directory, pass --config".into()),
    }
}

fn post_graph(graph: &Graph, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let api_url = format!("{}/api/v1/graph", url.trim_end_matches('/'));
    print_info(&format!("Posting graph to: {}", api_url));

    let client = reqwest::blocking::Client::new();
    let response = client
        .post(&api_url)
        .json(&graph.export())
        .send()?;

    if response.status().is_success() {
        print_success(&format!(
            "Posted {} resources and {} edges",
            graph.node_count(),
            graph.edge_count()
        ));
    } else {
        let status = response.status();
        let error_text = response.text()?;
        eprintln!("{}", error_text);
        return Err(format!("Failed to post graph: HTTP {}", status).into());
    }
    Ok(())
}
