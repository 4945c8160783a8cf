use nutanix_collector::graph::Graph;
use nutanix_collector::resources::{BaseResource, Resource};
use petgraph::graph::NodeIndex;
use serde::Serialize;

pub fn output_data<T: Serialize>(data: &T, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "yaml" => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        "json" | _ => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
    }
    Ok(())
}

/// Render the graph as an indented tree, one line per resource.
pub fn output_graph(graph: &Graph, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if format != "pretty" {
        return output_data(&graph.export(), format);
    }
    let mut lines = Vec::new();
    render_node(graph, graph.root(), 0, &mut lines);
    println!("{}", lines.join("\n"));
    Ok(())
}

fn render_node(graph: &Graph, idx: NodeIndex, depth: usize, lines: &mut Vec<String>) {
    let Some(resource) = graph.node(idx) else {
        return;
    };
    let detail = match resource {
        Resource::PrismCentralAccount(pc) => format!(" ({}:{})", pc.endpoint, pc.port),
        Resource::VirtualMachine(vm) => format!(" [{}]", vm.power_state),
        _ => String::new(),
    };
    lines.push(format!(
        "{}{} {} {}{}",
        "  ".repeat(depth),
        icon(resource),
        resource.kind().display_name(),
        resource.name(),
        detail
    ));
    for child in graph.successors(idx) {
        render_node(graph, child, depth + 1, lines);
    }
}

fn icon(resource: &Resource) -> &'static str {
    match resource {
        Resource::GraphRoot(_) => "🌐",
        Resource::PrismCentralAccount(_) => "🏢",
        Resource::PrismElement(_) => "🗄️",
        Resource::VirtualMachine(_) => "💻",
    }
}

pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

pub fn print_error(message: &str) {
    eprintln!("\x1b[31m❌ Error: {}\x1b[0m", message);
}

pub fn print_warning(message: &str) {
    eprintln!("\x1b[33m⚠️  Warning: {}\x1b[0m", message);
}

pub fn print_info(message: &str) {
    eprintln!("ℹ️  {}", message);
}
