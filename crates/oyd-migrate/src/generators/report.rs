//! Migration reports built from a saved session.

use serde_json::{json, Value};
use std::fmt::Write as _;

use crate::error::Result;
use crate::session::MigrationSession;

/// Output format of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    /// Markdown document.
    #[default]
    Markdown,
    /// Standalone HTML page.
    Html,
    /// JSON document.
    Json,
}

const NEXT_STEPS: [&str; 4] = [
    "Point client applications at the Foundry project endpoint and agent name.",
    "Review agent instructions in the Foundry portal.",
    "Run `oyd-migrate validate agent` with production queries.",
    "Retire the On Your Data configuration once traffic has moved.",
];

fn status(session: &MigrationSession) -> String {
    if session.completed {
        "Completed".to_string()
    } else {
        format!("In Progress ({})", session.current_stage.title())
    }
}

fn outcome(session: &MigrationSession) -> &'static str {
    match session.migration_succeeded {
        Some(true) => "Succeeded",
        Some(false) => "Failed",
        None => "Not run",
    }
}

fn architecture(session: &MigrationSession) -> &'static str {
    session.migration_options.migration_path.display_name()
}

fn timestamp(t: &chrono::DateTime<chrono::Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Renders a report for the session.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn generate_report(session: &MigrationSession, format: ReportFormat) -> Result<String> {
    Ok(match format {
        ReportFormat::Markdown => markdown(session),
        ReportFormat::Html => html(session),
        ReportFormat::Json => serde_json::to_string_pretty(&report_json(session))?,
    })
}

fn markdown(session: &MigrationSession) -> String {
    let mut md = String::from("# OYD to Foundry Migration Report\n\n");
    let _ = writeln!(md, "- **Session ID:** {}", session.session_id);
    let _ = writeln!(md, "- **Started:** {}", timestamp(&session.started_at));
    let _ = writeln!(md, "- **Last Updated:** {}", timestamp(&session.updated_at));
    let _ = writeln!(md, "- **Status:** {}", status(session));
    let _ = writeln!(md, "- **Outcome:** {}", outcome(session));

    md.push_str("\n## Summary\n\n| Metric | Value |\n|--------|-------|\n");
    let _ = writeln!(md, "| Architecture | {} |", architecture(session));
    let _ = writeln!(md, "| Deployments | {} |", session.aoai_configs.len());
    let _ = writeln!(md, "| Connections created | {} |", session.created_connections.len());
    let _ = writeln!(md, "| Agents created | {} |", session.created_agents.len());
    let _ = writeln!(
        md,
        "| Tests passed | {}/{} |",
        session.tests_passed(),
        session.test_results.len()
    );

    md.push_str("\n## Source\n\n### Azure OpenAI Deployments\n\n");
    if session.aoai_configs.is_empty() {
        md.push_str("_None selected._\n");
    } else {
        md.push_str("| Resource | Deployment | Query Type |\n|----------|------------|------------|\n");
        for aoai in &session.aoai_configs {
            let _ = writeln!(
                md,
                "| {} | {} | {} |",
                aoai.resource_name,
                aoai.deployment_name,
                aoai.query_type.as_deref().unwrap_or("-")
            );
        }
    }

    md.push_str("\n### Azure AI Search Services\n\n");
    if session.search_configs.is_empty() {
        md.push_str("_None selected._\n");
    } else {
        md.push_str("| Service | Index | Authentication |\n|---------|-------|----------------|\n");
        for search in &session.search_configs {
            let _ = writeln!(
                md,
                "| {} | {} | {} |",
                search.service_name,
                search.index_name.as_deref().unwrap_or("-"),
                if search.use_managed_identity {
                    "Managed Identity"
                } else {
                    "API Key"
                }
            );
        }
    }

    md.push_str("\n## Target\n\n");
    match &session.foundry_config {
        Some(foundry) => {
            let _ = writeln!(md, "- **Project:** {}", foundry.project_name);
            let _ = writeln!(md, "- **Resource Group:** {}", foundry.resource_group);
            let _ = writeln!(md, "- **Endpoint:** {}", foundry.project_endpoint);
            let _ = writeln!(md, "- **Model:** {}", foundry.model_deployment);
        }
        None => md.push_str("_Not configured._\n"),
    }

    md.push_str("\n## Resources Created\n\n### Connections\n\n");
    push_list(&mut md, &session.created_connections);
    md.push_str("\n### Agents\n\n");
    push_list(&mut md, &session.created_agents);

    md.push_str("\n## Test Results\n\n");
    if session.test_results.is_empty() {
        md.push_str("_No tests were run._\n");
    } else {
        md.push_str("| Test | Result |\n|------|--------|\n");
        for (test, passed) in &session.test_results {
            let _ = writeln!(md, "| {} | {} |", test, if *passed { "✅ Passed" } else { "❌ Failed" });
        }
    }

    md.push_str("\n## Next Steps\n\n");
    for (i, step) in NEXT_STEPS.iter().enumerate() {
        let _ = writeln!(md, "{}. {}", i + 1, step);
    }
    md
}

fn push_list(md: &mut String, items: &[String]) {
    if items.is_empty() {
        md.push_str("_None._\n");
    }
    for item in items {
        let _ = writeln!(md, "- {item}");
    }
}

/// Escapes text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HTML_STYLE: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;margin-bottom:1rem}\
th,td{border:1px solid #ccc;padding:.4rem .8rem;text-align:left}\
th{background:#f3f3f3}.pass{color:#107c10}.fail{color:#c50f1f}";

fn html_table(html: &mut String, headers: &[&str], rows: &[Vec<String>]) {
    html.push_str("<table>\n<tr>");
    for h in headers {
        let _ = write!(html, "<th>{}</th>", escape_html(h));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape_html(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

fn html(session: &MigrationSession) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Migration Report {id}</title>\n<style>{HTML_STYLE}</style>\n</head>\n<body>\n\
         <h1>OYD to Foundry Migration Report</h1>\n",
        id = escape_html(&session.session_id)
    );

    html_table(
        &mut html,
        &["Field", "Value"],
        &[
            vec!["Session ID".into(), session.session_id.clone()],
            vec!["Started".into(), timestamp(&session.started_at)],
            vec!["Last Updated".into(), timestamp(&session.updated_at)],
            vec!["Status".into(), status(session)],
            vec!["Outcome".into(), outcome(session).into()],
            vec!["Architecture".into(), architecture(session).into()],
            vec![
                "Tests Passed".into(),
                format!("{}/{}", session.tests_passed(), session.test_results.len()),
            ],
        ],
    );

    html.push_str("<h2>Source Deployments</h2>\n");
    let deployments: Vec<Vec<String>> = session
        .aoai_configs
        .iter()
        .map(|a| vec![a.resource_name.clone(), a.deployment_name.clone(), a.endpoint.clone()])
        .collect();
    html_table(&mut html, &["Resource", "Deployment", "Endpoint"], &deployments);

    html.push_str("<h2>Search Services</h2>\n");
    let services: Vec<Vec<String>> = session
        .search_configs
        .iter()
        .map(|s| {
            vec![
                s.service_name.clone(),
                s.index_name.clone().unwrap_or_else(|| "-".into()),
                s.endpoint.clone(),
            ]
        })
        .collect();
    html_table(&mut html, &["Service", "Index", "Endpoint"], &services);

    if let Some(foundry) = &session.foundry_config {
        html.push_str("<h2>Target Project</h2>\n");
        html_table(
            &mut html,
            &["Project", "Endpoint", "Model"],
            &[vec![
                foundry.project_name.clone(),
                foundry.project_endpoint.clone(),
                foundry.model_deployment.clone(),
            ]],
        );
    }

    html.push_str("<h2>Resources Created</h2>\n<ul>\n");
    for name in &session.created_connections {
        let _ = writeln!(html, "<li>Connection: {}</li>", escape_html(name));
    }
    for name in &session.created_agents {
        let _ = writeln!(html, "<li>Agent: {}</li>", escape_html(name));
    }
    html.push_str("</ul>\n<h2>Test Results</h2>\n<table>\n<tr><th>Test</th><th>Result</th></tr>\n");
    for (test, passed) in &session.test_results {
        let (class, label) = if *passed {
            ("pass", "✅ Passed")
        } else {
            ("fail", "❌ Failed")
        };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"{class}\">{label}</td></tr>",
            escape_html(test)
        );
    }
    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn report_json(session: &MigrationSession) -> Value {
    let test_results: Vec<Value> = session
        .test_results
        .iter()
        .map(|(test, passed)| json!({ "test": test, "passed": passed }))
        .collect();

    json!({
        "metadata": {
            "session_id": session.session_id,
            "started_at": session.started_at,
            "updated_at": session.updated_at,
            "current_stage": session.current_stage,
            "completed": session.completed,
        },
        "summary": {
            "migration_path": session.migration_options.migration_path,
            "migration_succeeded": session.migration_succeeded,
            "deployments": session.aoai_configs.len(),
            "connections_created": session.created_connections.len(),
            "agents_created": session.created_agents.len(),
            "tests_passed": session.tests_passed(),
            "tests_total": session.test_results.len(),
        },
        "source": {
            "azure": session.azure_config,
            "openai": session.aoai_configs,
            "search": session.search_configs,
        },
        "target": session.foundry_config,
        "resources": {
            "connections": session.created_connections,
            "agents": session.created_agents,
        },
        "test_results": test_results,
    })
}
