//! Small CLI around the loader: generate keys, seal or open single values, and
//! load a configured environment.

use std::env;

use dotenvx_rs::config::{load_config, load_environment, KeySourceConfig};
use dotenvx_rs::crypto::SealedBoxCodec;
use dotenvx_rs::sink::ProcessEnvSink;
use dotenvx_rs::store::VariableNode;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Commands:\n  keypair\n  encrypt <public_key> <plaintext>\n  decrypt <value>   (keys from DOTENV_PUBLIC_KEY / DOTENV_PRIVATE_KEY)\n  load <config.json>");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Same shape as the tree, every value replaced.
fn redacted(node: &VariableNode) -> Value {
    match node {
        VariableNode::Leaf(_) => Value::String("<redacted>".to_string()),
        VariableNode::Branch(children) => Value::Object(
            children
                .iter()
                .map(|(key, child)| (key.clone(), redacted(child)))
                .collect(),
        ),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("output failed: {err}"),
    }
}

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "keypair" => {
            if args.len() != 2 {
                return print_usage();
            }
            match SealedBoxCodec::generate_key_pair() {
                Ok(pair) => print_json(&json!({
                    "DOTENV_PUBLIC_KEY": pair.public_key(),
                    "DOTENV_PRIVATE_KEY": pair.private_key(),
                })),
                Err(err) => eprintln!("key generation failed: {err}"),
            }
        }
        "encrypt" => {
            if args.len() != 4 {
                return print_usage();
            }
            match SealedBoxCodec::encrypt(&args[3], &args[2]) {
                Ok(value) => println!("{value}"),
                Err(err) => eprintln!("encryption failed: {err}"),
            }
        }
        "decrypt" => {
            if args.len() != 3 {
                return print_usage();
            }
            let pair = match KeySourceConfig::from_default_env().build_key_pair() {
                Ok(pair) => pair,
                Err(err) => return eprintln!("key setup failed: {err}"),
            };
            match SealedBoxCodec::decrypt(&args[2], &pair) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("decryption failed: {err}"),
            }
        }
        "load" => {
            if args.len() != 3 {
                return print_usage();
            }
            let config = match load_config(&args[2]) {
                Ok(config) => config,
                Err(err) => return eprintln!("config load failed: {err}"),
            };
            let mut sink = ProcessEnvSink {
                overwrite: config.overwrite_env,
            };
            match load_environment(&config, &mut sink) {
                Ok(store) => print_json(&redacted(&store.materialize())),
                Err(err) => eprintln!("environment load failed: {err}"),
            }
        }
        _ => print_usage(),
    }
}
