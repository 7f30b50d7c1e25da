//! Fetch command: route one request through the worker

use colored::Colorize;
use reqwest::Method;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::error::{Error, Result};
use crate::http::Request;
use crate::output::{format_size, format_table, format_worker_json};
use crate::worker::routes::RouteClass;
use crate::worker::{FetchOutcome, ResponseSource};

/// JSON view of a routed request
#[derive(Debug, Serialize)]
struct FetchView {
    method: String,
    url: String,
    class: RouteClass,
    status: Option<u16>,
    source: Option<ResponseSource>,
    body: Option<String>,
}

#[derive(Tabled)]
struct FetchRow {
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "SOURCE")]
    source: String,
    #[tabled(rename = "CLASS")]
    class: String,
    #[tabled(rename = "URL")]
    url: String,
    #[tabled(rename = "SIZE")]
    size: String,
}

pub async fn run(
    opts: &GlobalOptions,
    url: &str,
    method: &str,
    headers: &[String],
    body: Option<&str>,
) -> Result<()> {
    let method = parse_method(method)?;
    let ctx = CommandContext::new(opts)?;
    let format = ctx.format;

    let mut request = Request::new(method, ctx.worker.router().resolve(url)?);
    for header in headers {
        let (name, value) = parse_header(header)?;
        request = request.with_header(name, value);
    }
    if let Some(body) = body {
        request = request.with_body(body);
    }

    let class = ctx.worker.router().classify(&request);
    let method = request.method.to_string();
    let url = request.url.to_string();

    let result = ctx.worker.fetch(request).await;
    let worker = ctx.finish().await?;
    let outcome = result?;

    match format {
        OutputFormat::Json => {
            let view = FetchView {
                method,
                url,
                class,
                status: outcome.response().map(|r| r.status),
                source: outcome.source(),
                body: outcome.response().map(|r| r.text()),
            };
            println!("{}", format_worker_json(&view, &worker)?);
        }
        OutputFormat::Table => match outcome {
            FetchOutcome::Response { response, source } => {
                let row = FetchRow {
                    status: response.status.to_string(),
                    source: source_label(source).to_string(),
                    class: class.to_string(),
                    url,
                    size: format_size(response.body.len()),
                };
                println!("{}", format_table(&[row]));
            }
            FetchOutcome::Unavailable => println!("No response available"),
        },
        OutputFormat::Pretty => match outcome {
            FetchOutcome::Response { response, source } => {
                let status = if response.is_success() {
                    response.status.to_string().green()
                } else {
                    response.status.to_string().yellow()
                };
                println!(
                    "{} {} {} ({}, {})",
                    status,
                    method.bold(),
                    url,
                    source_label(source).cyan(),
                    class
                );
                if let Some(content_type) = response.header("content-type") {
                    println!("{} {}", "content-type:".dimmed(), content_type);
                }
                println!();
                println!("{}", response.text());
            }
            FetchOutcome::Unavailable => {
                println!("{} {} {} ({})", "✗".red(), method.bold(), url, class);
                println!("No response available");
            }
        },
    }

    Ok(())
}

fn source_label(source: ResponseSource) -> &'static str {
    match source {
        ResponseSource::Network => "network",
        ResponseSource::Cache => "cache",
    }
}

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::Other(format!("Invalid HTTP method '{}'", raw)))
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(Error::Other(format!(
            "Invalid header '{}', expected NAME:VALUE",
            raw
        ))),
    }
}
