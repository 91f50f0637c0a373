//! OMF CLI - Tool for inspecting OMF files.

use std::env;

use omf::container::ObjectId;
use omf::file::SwapPolicy;
use omf::media::MediaHandle;
use omf::prelude::*;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const PREVIEW_BYTES: usize = 16;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "off",
            _ => filtered_args.push(arg),
        }
    }
    let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
    if json_mode {
        level = "off";
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let session = match Session::begin() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to start session: {}", e);
            std::process::exit(1);
        }
    };

    match filtered_args[0] {
        "info" | "i" => {
            let path = require_file(&filtered_args, "info <file.omf>");
            cmd_info(&session, path);
        }
        "objects" | "o" => {
            let path = require_file(&filtered_args, "objects <file.omf>");
            cmd_objects(&session, path);
        }
        "dump" | "d" => {
            let path = require_file(&filtered_args, "dump <file.omf> [--json]");
            cmd_dump(&session, path, json_mode);
        }
        "codecs" => {
            for id in session.codec_ids() {
                if let Ok(codec) = session.codec(&id) {
                    let meta = codec.meta();
                    println!(
                        "{:<6} {:<32} {}..{}  {}",
                        meta.id,
                        meta.name,
                        meta.min_revision,
                        meta.max_revision,
                        meta.data_kinds.join(", ")
                    );
                }
            }
        }
        "--version" | "-V" | "version" => {
            println!("omf {} (built {})", env!("CARGO_PKG_VERSION"), env!("OMF_BUILD_DATE"));
        }
        "help" | "h" | "-h" | "--help" => print_help(),
        other if other.ends_with(".omf") => cmd_info(&session, other),
        other => {
            eprintln!("Unknown command: {}", other);
            print_help();
            std::process::exit(1);
        }
    }

    session.end();
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn require_file<'a>(args: &[&'a str], usage: &str) -> &'a str {
    match args.get(1) {
        Some(path) if *path != "--json" && *path != "-j" => path,
        _ => {
            eprintln!("Error: missing file argument");
            eprintln!("Usage: omf {}", usage);
            std::process::exit(1);
        }
    }
}

fn print_help() {
    println!("omf - Open Media Framework file inspector");
    println!();
    println!("USAGE:");
    println!("    omf [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info    <file>            Show revision, byte order, mobs and media");
    println!("    o, objects <file>            List every object with its class");
    println!("    d, dump    <file> [--json]   Dump every object with its properties");
    println!("    codecs                       List registered codecs");
    println!("    version                      Show version and build date");
    println!("    h, help                      Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress all log output");
    println!();
    println!("    RUST_LOG overrides the level chosen by the flags.");
}

fn open_or_exit(session: &Session, path: &str) -> OmfFile {
    info!("Opening file: {}", path);
    match session.open_file(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to open {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

fn class_name(file: &mut OmfFile, obj: ObjectId) -> String {
    file.class_of(obj)
        .map(|c| c.to_string())
        .unwrap_or_else(|_| "????".to_string())
}

fn cmd_info(session: &Session, path: &str) {
    let mut file = open_or_exit(session, path);
    let head = file.head();

    println!("File: {}", path);
    println!("Revision: {}", file.revision());
    println!("Byte order: {}", file.byte_order());
    if let Ok(version) = file.read_version_type(head, PropCode::HEAD_VERSION) {
        println!("Version: {}", version);
    }
    if let Ok(toolkit) = file.read_product_version(head, PropCode::HEAD_TOOLKIT_VERSION) {
        println!("Toolkit: {}", toolkit);
    }
    if let Ok(stamp) = file.read_time_stamp(head, PropCode::HEAD_LAST_MODIFIED) {
        println!("Last modified: {} (unix seconds)", stamp.seconds);
    }
    println!("Objects: {}", file.objects().len());

    let mobs = file.read_obj_refs(head, PropCode::HEAD_MOBS).unwrap_or_default();
    let media_data = file.read_obj_refs(head, PropCode::HEAD_MEDIA_DATA).unwrap_or_default();
    println!("Mobs: {}", mobs.len());
    for mob in mobs {
        let class = class_name(&mut file, mob);
        let name = file.read_string(mob, PropCode::MOBJ_NAME).unwrap_or_default();
        let Ok(mob_id) = file.read_uid(mob, PropCode::MOBJ_MOB_ID) else {
            println!("  [{}] {} (no mob id)", class, name);
            continue;
        };
        println!("  [{}] {} {}", class, mob_id, name);
        if class != ClassId::SMOB.to_string() {
            continue;
        }
        match MediaHandle::open(&mut file, mob_id) {
            Ok(mut media) => {
                let samples = media.sample_count(&mut file).unwrap_or(0);
                println!(
                    "      codec {} {:?} rate {} samples {}",
                    media.codec_id(),
                    media.kind(),
                    media.sample_rate(),
                    samples
                );
                if let Err(e) = media.close(&mut file) {
                    debug!("media close failed: {}", e);
                }
            }
            Err(e) => println!("      media unavailable: {}", e),
        }
    }
    println!("Media data objects: {}", media_data.len());
}

fn cmd_objects(session: &Session, path: &str) {
    let mut file = open_or_exit(session, path);
    for obj in file.objects() {
        let class = class_name(&mut file, obj);
        let count = file.object_properties(obj).map(|p| p.len()).unwrap_or(0);
        println!("{:>6}  {}  {} properties", obj.0, class, count);
    }
}

fn preview(file: &mut OmfFile, obj: ObjectId, prop: &omf::file::PropertyInfo) -> Option<Vec<u8>> {
    let (code, ty) = (prop.prop?, prop.ty?);
    let len = (prop.size as usize).min(PREVIEW_BYTES);
    let mut buf = vec![0u8; len];
    file.read_prop(obj, code, 0, SwapPolicy::NoSwap, ty, &mut buf).ok()?;
    Some(buf)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

fn cmd_dump(session: &Session, path: &str, json_mode: bool) {
    let mut file = open_or_exit(session, path);
    let mut objects = Vec::new();

    if !json_mode {
        println!("File: {} ({}, {})", path, file.revision(), file.byte_order());
        println!();
    }
    for obj in file.objects() {
        let class = class_name(&mut file, obj);
        let props = match file.object_properties(obj) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Object {}: {}", obj.0, e);
                continue;
            }
        };
        if json_mode {
            let values: Vec<serde_json::Value> = props
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "property": p.prop_name,
                        "type": p.type_name,
                        "size": p.size,
                        "raw": preview(&mut file, obj, p).map(|b| hex(&b)),
                    })
                })
                .collect();
            objects.push(serde_json::json!({
                "id": obj.0,
                "class": class,
                "properties": values,
            }));
        } else {
            println!("[{}] {}", obj.0, class);
            for p in &props {
                let raw = preview(&mut file, obj, p).map(|b| hex(&b)).unwrap_or_default();
                let more = if p.size as usize > PREVIEW_BYTES { " ..." } else { "" };
                println!("    {:<32} {:<22} {:>6}  {}{}", p.prop_name, p.type_name, p.size, raw, more);
            }
        }
    }

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "file": path,
                "revision": file.revision().to_string(),
                "byte_order": file.byte_order().to_string(),
                "objects": objects,
            }))
            .unwrap_or_default()
        );
    }
}
