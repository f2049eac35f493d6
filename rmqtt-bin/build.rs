use std::error::Error;
use std::fs::File;
use std::io::prelude::*;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=Cargo.toml");

    let mut cargo_text = String::new();
    File::open("Cargo.toml").and_then(|mut f| f.read_to_string(&mut cargo_text))?;
    let decoded: toml::Value = toml::from_str(&cargo_text)?;

    version(&decoded)?;
    plugins(&decoded)?;
    Ok(())
}

fn plugins(decoded: &toml::Value) -> Result<(), Box<dyn Error>> {
    let mut inits = Vec::new();
    if let Some(plugins) = decoded
        .get("package")
        .and_then(|package| package.get("metadata"))
        .and_then(|metadata| metadata.get("plugins"))
        .and_then(|plugins| plugins.as_table())
    {
        for (id, cfg) in plugins {
            let plugin_id = id.replace('-', "_");
            let name = cfg.get("name").and_then(|v| v.as_str()).unwrap_or(id);
            let descr = cfg.get("description").and_then(|v| v.as_str()).unwrap_or_default();
            let default_startup = cfg.get("default_startup").and_then(|v| v.as_bool()).unwrap_or(false);
            let immutable = cfg.get("immutable").and_then(|v| v.as_bool()).unwrap_or(false);

            println!(
                "plugin_id: {}, default_startup: {}, immutable: {}, name: {}, descr: {}",
                plugin_id, default_startup, immutable, name, descr
            );

            inits.push(format!(
                "    {}::register_named(scx, r#\"{}\"#, {} || default_startups.iter().any(|n| n == r#\"{}\"#), {}).await?;",
                plugin_id, name, default_startup, name, immutable
            ));
        }
    }

    let out = std::env::var("OUT_DIR")?;
    let mut plugin_rs = File::create(format!("{}/{}", out, "plugin.rs"))?;
    plugin_rs.write_all(
        b"pub(crate) async fn registers(scx: &rmqtt_ext::context::ServerContext, default_startups: &[String]) -> rmqtt_ext::Result<()> {\n",
    )?;
    plugin_rs.write_all(inits.join("\n").as_bytes())?;
    plugin_rs.write_all(b"\n    Ok(())\n}")?;
    Ok(())
}

fn version(decoded: &toml::Value) -> Result<(), Box<dyn Error>> {
    let version = decoded
        .get("package")
        .and_then(|package| package.get("version"))
        .and_then(|version| version.as_str())
        .ok_or("package.version is missing")?;
    let build_time = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    let server_version = format!("rmqtt-subcheck/{}-{}", &version, &build_time);

    let out = std::env::var("OUT_DIR")?;
    let mut version_file = File::create(format!("{}/{}", out, "version.rs"))?;
    version_file.write_all(b"\n/// rmqtt-subcheck version")?;
    version_file.write_all(format!("\npub const VERSION: &str = \"{}\";", server_version).as_bytes())?;
    Ok(())
}
