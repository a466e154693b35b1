use crate::output::{print_json, print_table};
use enforcer_core::{ConfigWarning, Settings, WarnLevel, SPEC_DEFAULTS};
use serde::Serialize;

#[derive(Serialize)]
struct EffectiveConfig<'a> {
    settings: &'a Settings,
    warnings: Vec<ConfigWarning>,
}

/// Print the merged settings and any validation findings. Errors fail the command.
pub fn show(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let warnings = settings.validate();
    let has_errors = warnings.iter().any(ConfigWarning::is_error);

    if json {
        print_json(&EffectiveConfig {
            settings,
            warnings,
        })?;
    } else {
        print!("{}", serde_yaml::to_string(settings)?);
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if has_errors {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}

/// Values filled in for fields a service never configured.
pub fn defaults(json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&SPEC_DEFAULTS);
    }
    let rows: Vec<Vec<String>> = SPEC_DEFAULTS
        .entries()
        .into_iter()
        .map(|(field, value)| vec![field.to_string(), value])
        .collect();
    print_table(&["FIELD", "DEFAULT"], &rows);
    Ok(())
}
