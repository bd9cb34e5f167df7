//! Init command - scaffold a new chart

use std::fs;
use std::path::Path;

use console::style;
use miette::{IntoDiagnostic, Result, WrapErr};

pub fn run(name: &str, output: &Path) -> Result<()> {
    let chart_dir = output.join(name);

    if chart_dir.exists() {
        return Err(miette::miette!(
            "Directory {} already exists",
            chart_dir.display()
        ));
    }

    for sub in [
        "templates/compose",
        "templates/files",
        "templates/helpers",
        "files",
    ] {
        fs::create_dir_all(chart_dir.join(sub))
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to create {} directory", sub))?;
    }

    let chart_yaml = format!(
        r#"name: {name}
version: 0.1.0
description: A Composepack chart for {name}
"#
    );
    fs::write(chart_dir.join("Chart.yaml"), chart_yaml)
        .into_diagnostic()
        .wrap_err("Failed to write Chart.yaml")?;

    let values_yaml = format!(
        r#"# Default values for {name}

image:
  repository: nginx
  tag: "latest"

ports:
  http: 8080

# environment:
#   APP_MODE: production
"#
    );
    fs::write(chart_dir.join("values.yaml"), values_yaml)
        .into_diagnostic()
        .wrap_err("Failed to write values.yaml")?;

    let web_template = format!(
        r#"services:
  web:
    image: {{{{ values.image.repository }}}}:{{{{ values.image.tag }}}}
    container_name: {{{{ release.name }}}}-{name}
    ports:
      - "{{{{ values.ports.http }}}}:80"
    labels:
      {{% include "helpers/labels" %}}
"#
    );
    fs::write(
        chart_dir.join("templates/compose/web.yaml.j2"),
        web_template,
    )
    .into_diagnostic()
    .wrap_err("Failed to write web.yaml.j2")?;

    let labels_helper = format!(
        r#"com.composepack.release: {{{{ release.name }}}}
      com.composepack.chart: {name}-{{{{ chart.version }}}}
"#
    );
    fs::write(chart_dir.join("templates/helpers/labels.j2"), labels_helper)
        .into_diagnostic()
        .wrap_err("Failed to write labels helper")?;

    println!(
        "{} Created chart {} at {}",
        style("✓").green(),
        style(name).bold(),
        chart_dir.display()
    );
    println!();
    println!("Next steps:");
    println!("  composepack template my-release {}", chart_dir.display());
    println!("  composepack install my-release {}", chart_dir.display());

    Ok(())
}
