//! Print what a classifier model file contains and which emotion it binds to.
//!
//! Usage: facemotion-inspect <model> [<features.json>]
//!
//! With a feature vector (a JSON array of numbers) the model's vote on it is
//! printed as well.

use std::env;
use std::fs::File;
use std::io::{BufReader, Read};

use facemotion::{BoostedModel, EmotionClassifier, EmotionLabel, FeatureVector};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <model> [<features.json>]", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    println!("Model: {}", path);

    match header(path) {
        Ok(bytes) => {
            println!("\nFirst {} bytes:", bytes.len());
            for (i, chunk) in bytes.chunks(16).enumerate() {
                print!("{:04x}: ", i * 16);
                for b in chunk {
                    print!("{:02x} ", b);
                }
                println!();
            }
        }
        Err(e) => {
            println!("FAILED to read file: {}", e);
            std::process::exit(1);
        }
    }

    let label = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(EmotionLabel::from_model_name);
    match label {
        Some(label) => println!("\nBound emotion: {}", label),
        None => println!("\nBound emotion: none (file name has no known emotion prefix)"),
    }

    let model = match BoostedModel::load(path) {
        Ok(model) => model,
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    };

    println!("  num_features: {}", model.num_features());
    println!("  threshold:    {}", model.threshold());
    println!("  trees:        {}", model.num_trees());
    for (i, weighted) in model.ensemble().trees.iter().enumerate() {
        println!(
            "    tree {:>3}: weight {:>9.5}, {} nodes, depth {}",
            i,
            weighted.weight,
            weighted.tree.num_nodes(),
            weighted.tree.depth()
        );
    }

    let Some(features_path) = args.get(2) else {
        return;
    };
    let Some(label) = label else {
        println!("\nCannot vote without a bound emotion");
        std::process::exit(1);
    };

    let features: Vec<f32> = match std::fs::read_to_string(features_path)
        .map_err(|e| e.to_string())
        .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
    {
        Ok(features) => features,
        Err(e) => {
            println!("FAILED to read features: {}", e);
            std::process::exit(1);
        }
    };

    let classifier = match EmotionClassifier::new(label, model) {
        Ok(classifier) => classifier,
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    };
    match classifier.predict(&FeatureVector::new(features)) {
        Ok(vote) => println!(
            "\nVote: {} fired={} confidence={}",
            vote.label, vote.fired, vote.confidence
        ),
        Err(e) => {
            println!("FAILED: {}", e);
            std::process::exit(1);
        }
    }
}

fn header(path: &str) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut bytes = Vec::with_capacity(64);
    BufReader::new(file).take(64).read_to_end(&mut bytes)?;
    Ok(bytes)
}
