// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Connect to an XMLA server, list what it serves and optionally run a query
//!
//! ```text
//! xmla-probe <config.yaml | connect-string> [MDX]
//! ```

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use xmla_olap_driver::{AxisOrdinal, HttpTransport, XmlaConfig, XmlaConnection};
use xmla_olap_metadata::{MetadataElement, WorkerPool};

fn load_config(source: &str) -> Result<XmlaConfig> {
    if source.ends_with(".yaml") || source.ends_with(".yml") {
        let text = std::fs::read_to_string(source)
            .with_context(|| format!("reading configuration file {}", source))?;
        Ok(XmlaConfig::from_yaml_str(&text)?)
    } else {
        Ok(XmlaConfig::from_connect_string(source)?)
    }
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let mut args = std::env::args().skip(1);
    let Some(source) = args.next() else {
        bail!("usage: xmla-probe <config.yaml | connect-string> [MDX]");
    };
    let query = args.next();

    let config = load_config(&source)?;
    config.validate()?;

    // the blocking API must not run on a runtime thread, so main stays synchronous
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("xmla-probe-io")
        .enable_all()
        .build()
        .context("failed to start the I/O runtime")?;
    let transport = Arc::new(HttpTransport::new(&config)?);
    let connection = XmlaConnection::open_with(
        config,
        transport,
        WorkerPool::from_handle(runtime.handle().clone()),
    )?;

    println!(
        "provider: {}",
        connection.session().provider_name().unwrap_or_else(|| "<unknown>".to_string())
    );
    for catalog in connection.catalogs().to_vec()? {
        println!("catalog {}", catalog.name());
        for schema in catalog.schemas().to_vec()? {
            println!("  schema {}", schema.name());
            for cube in schema.cubes().to_vec()? {
                println!(
                    "    cube {} ({} dimensions, {} measures)",
                    cube.name(),
                    cube.dimensions().len()?,
                    cube.measures().len()
                );
            }
        }
    }

    if let Some(mdx) = query {
        let statement = connection.create_statement()?;
        let cell_set = statement.execute(&mdx).context("query failed")?;
        for axis in cell_set.axes()? {
            println!("{}: {} positions", axis.ordinal(), axis.position_count());
        }
        let filter = cell_set.filter_axis()?;
        if filter.position_count() > 0 {
            let slicer: Vec<String> = cell_set
                .position_members(AxisOrdinal::Filter, 0)?
                .iter()
                .map(|m| m.unique_name().to_string())
                .collect();
            println!("slicer: {}", slicer.join(", "));
        }
        println!("cells: {}", cell_set.cell_count()?);
        statement.close();
    }

    connection.close();
    Ok(())
}
