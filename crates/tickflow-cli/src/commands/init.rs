//! Initialize a new tickflow project

use anyhow::Result;
use std::fs;
use std::path::Path;
use tickflow_core::config::CONFIG_FILE;

const SENSOR_1: &str = "0,4.00
1,4.41
2,4.84
3,5.29
4,5.76
5,6.25
6,6.76
7,7.29
8,7.84
9,8.41
";

const SENSOR_2: &str = "0,1.0
1,1.4
2,1.9
3,2.1
4,2.0
5,2.6
6,3.1
7,3.0
8,3.5
9,4.2
";

const SENSOR_3: &str = "0,0.9
1,1.1
2,1.6
3,1.2
4,0.8
5,1.5
6,2.2
7,1.9
8,2.4
9,2.0
";

fn pipeline_yaml(name: &str) -> String {
    format!(
        r#"# Tickflow pipeline configuration
#
# Each cycle runs every connector once. A connector pulls one value from its
# producer and pushes it to every target. The run ends as soon as any source
# is exhausted.
name: {name}
description: Three sensors fused into two motor commands

# derived: order connectors by their dependencies
# declared: run connectors exactly as listed below
order: derived

output_dir: out
diagnostics: run.log

nodes:
  - {{ name: Sensor1, type: csv_source, path: data/sensor_1.csv, column: 1 }}
  - {{ name: Sensor2, type: csv_source, path: data/sensor_2.csv, column: 1 }}
  - {{ name: Sensor3, type: csv_source, path: data/sensor_3.csv, column: 1 }}
  - {{ name: Conversion1, type: transform, functor: {{ kind: square_root_scale }} }}
  - {{ name: Conversion2, type: stateful, seed: -1, functor: {{ kind: difference }} }}
  - {{ name: Scale1, type: transform, functor: {{ kind: affine_scale, alpha: 2.7, beta: 1.0 }} }}
  - {{ name: Scale2, type: transform, functor: {{ kind: affine_scale, alpha: 0.7, beta: -0.5 }} }}
  - {{ name: Scale3, type: transform, functor: {{ kind: affine_scale, alpha: 1.0, beta: 0.2 }} }}
  - {{ name: SensorFusion, type: transform, functor: {{ kind: fusion }} }}
  - {{ name: MotorA, type: transform, functor: {{ kind: clamp }} }}
  - {{ name: MotorB, type: transform, functor: {{ kind: clamp, invert: true }} }}
  - {{ name: MotorASink, type: csv_sink, path: motorA.csv }}
  - {{ name: MotorBSink, type: csv_sink, path: motorB.csv }}

# Targets: Node.N is input port N of a transform; a bare Node is a sink or
# stateful node. Logs record "cycle,value" per transfer.
connectors:
  - {{ name: c1, from: Sensor1, to: [Conversion1.1], log: c1.txt }}
  - {{ name: c2, from: Sensor2, to: [Conversion2], log: c2.txt }}
  - {{ name: c3, from: Conversion1, to: [Scale1.1], log: c3.txt }}
  - {{ name: c4, from: Conversion2, to: [Scale2.1], log: c4.txt }}
  - {{ name: c5, from: Sensor3, to: [Scale3.1], log: c5.txt }}
  - {{ name: c6, from: Scale1, to: [SensorFusion.1], log: c6.txt }}
  - {{ name: c7, from: Scale2, to: [SensorFusion.2], log: c7.txt }}
  - {{ name: c8, from: Scale3, to: [SensorFusion.3], log: c8.txt }}
  - {{ name: c9, from: SensorFusion, to: [MotorA.1, MotorB.1], log: c9.txt }}
  - {{ name: c10, from: MotorA, to: [MotorASink], log: c10.txt }}
  - {{ name: c11, from: MotorB, to: [MotorBSink], log: c11.txt }}
"#
    )
}

/// Run the init command
pub fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    // Derive pipeline name from directory name if not provided
    let pipeline_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine pipeline name from path"))?,
    };

    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE
        );
    }

    tracing::info!("Creating new tickflow project: {}", pipeline_name);

    fs::write(project_dir.join(CONFIG_FILE), pipeline_yaml(&pipeline_name))?;

    fs::create_dir_all(project_dir.join("data"))?;
    fs::write(project_dir.join("data/sensor_1.csv"), SENSOR_1)?;
    fs::write(project_dir.join("data/sensor_2.csv"), SENSOR_2)?;
    fs::write(project_dir.join("data/sensor_3.csv"), SENSOR_3)?;

    let gitignore = r#"# Pipeline outputs
out/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        pipeline_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  tickflow validate    # Check configuration");
    tracing::info!("  tickflow show        # Print the execution order");
    tracing::info!("  tickflow run         # Run until a sensor is exhausted");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickflow_core::Config;

    #[test]
    fn test_scaffold_parses() {
        let pipeline = Config::parse(&pipeline_yaml("fusion")).unwrap();
        assert_eq!(pipeline.name, "fusion");
        assert_eq!(pipeline.nodes.len(), 13);
        assert_eq!(pipeline.connectors.len(), 11);
    }

    #[test]
    fn test_sample_data_has_equal_lengths() {
        let rows = |text: &str| text.lines().count();
        assert_eq!(rows(SENSOR_1), 10);
        assert_eq!(rows(SENSOR_2), 10);
        assert_eq!(rows(SENSOR_3), 10);
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_str().unwrap();
        run(path, Some("first")).unwrap();
        assert!(run(path, Some("second")).is_err());

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.pipeline.name, "first");
    }
}
