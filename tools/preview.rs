/// Preview: interactive shell for trying the engine against a catalog.
///
/// Usage: preview --catalog <path> [--config <path>] [--seed <n>]
///
/// Commands:
///   run  run once and print blocks and metadata
///   bulk <n>  run n times, recording history, and print stats
///   person <id>  set the person id
///   age <6-7|8-9|10-11>  set the age group
///   theme <name>  set the theme
///   mode <surprise|self|family>  set the character mode
///   name <name> [age]  set the reader's name and age
///   costar <name> <relation>  add a co-star (family mode)
///   learn <theme|none>  set or clear the learning theme
///   enable <json>  set the enabled-ids flag value
///   gate  check the feature gate for the person
///   fail <on|off>  make every store read fail
///   seed <n>  set RNG seed
///   help  list commands
///   quit  exit

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use story_flow::core::config::EngineConfig;
use story_flow::core::engine::{EmotionFlowResult, FlowEngine};
use story_flow::core::feature_gate::FeatureGate;
use story_flow::schema::request::{
    AgeGroup, CharacterMode, CoStar, FlowRequest, PersonId, PersonIdentity, Theme,
};
use story_flow::store::memory::MemoryStore;
use story_flow::store::HistoryRepo;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "story_flow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut config_path = None;
    let mut seed: u64 = 42;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = args[i].parse().unwrap_or(42);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(catalog_path) = catalog_path else {
        eprintln!("--catalog is required");
        print_usage();
        std::process::exit(1);
    };

    let store = match MemoryStore::load_from_ron(Path::new(&catalog_path)) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Failed to load catalog {}: {}", catalog_path, e);
            std::process::exit(1);
        }
    };

    let config = match config_path {
        Some(ref path) => match EngineConfig::load_from_ron(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let catalog = store.catalog();
    println!(
        "Loaded {} blueprints, {} character seeds, {} story elements",
        catalog.blueprints.len(),
        catalog.character_seeds.len(),
        catalog.story_elements.len()
    );
    println!("Seed: {}", seed);
    println!("Type 'help' for commands.\n");

    let engine = match FlowEngine::builder()
        .store(store.clone())
        .config(config.clone())
        .build()
    {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to build engine: {}", e);
            std::process::exit(1);
        }
    };
    let gate = FeatureGate::new(store.clone(), config.feature_flag_key.clone());

    let mut request = FlowRequest {
        person_id: PersonId::new("preview"),
        age_group: AgeGroup::EightToNine,
        theme: Theme::new(Theme::MAGIC_FANTASY),
        character_mode: CharacterMode::Surprise,
        person_identity: PersonIdentity {
            name: "Mara".to_string(),
            age: Some(8),
            ..PersonIdentity::default()
        },
        co_stars: Vec::new(),
        learning_theme: None,
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "run" => match engine.run_with_rng(&request, &mut rng).await {
                Ok(result) => print_result(&result),
                Err(e) => println!("ERROR: {}", e),
            },
            "bulk" => {
                let count: usize = match parts.get(1).map(|p| p.parse()) {
                    Some(Ok(n)) if n > 0 => n,
                    _ => {
                        println!("Usage: bulk <n>");
                        continue;
                    }
                };
                run_bulk(&engine, store.as_ref(), &request, &mut rng, count).await;
            }
            "person" => match parts.get(1) {
                Some(id) => {
                    request.person_id = PersonId::new(*id);
                    println!("Person set to {}", request.person_id);
                }
                None => println!("Current person: {}", request.person_id),
            },
            "age" => match parts.get(1).and_then(|a| AgeGroup::parse(a)) {
                Some(age) => {
                    request.age_group = age;
                    println!("Age group set to {}", age);
                }
                None => println!("Usage: age <6-7|8-9|10-11>"),
            },
            "theme" => match parts.get(1) {
                Some(theme) => {
                    request.theme = Theme::new(*theme);
                    println!("Theme set to {}", request.theme);
                }
                None => {
                    println!("Usage: theme <name>");
                    println!("  magic_fantasy, adventure_action, animals_nature,");
                    println!("  space_science, friendship_family, everyday_life");
                }
            },
            "mode" => match parts.get(1).and_then(|m| parse_mode(m)) {
                Some(mode) => {
                    request.character_mode = mode;
                    println!("Character mode set to {}", mode.label());
                }
                None => println!("Usage: mode <surprise|self|family>"),
            },
            "name" => {
                let Some(name) = parts.get(1) else {
                    println!("Usage: name <name> [age]");
                    continue;
                };
                request.person_identity.name = name.to_string();
                request.person_identity.age = parts.get(2).and_then(|a| a.parse().ok());
                println!("Reader set to {}", name);
            }
            "costar" => {
                if parts.len() < 3 {
                    println!("Usage: costar <name> <relationship>");
                    for co_star in &request.co_stars {
                        println!("  {} ({})", co_star.name, co_star.relationship);
                    }
                    continue;
                }
                request.co_stars.push(CoStar {
                    name: parts[1].to_string(),
                    relationship: parts[2..].join(" "),
                    appearance: None,
                });
                println!("{} co-stars", request.co_stars.len());
            }
            "learn" => match parts.get(1) {
                Some(&"none") => {
                    request.learning_theme = None;
                    println!("Learning theme cleared.");
                }
                Some(theme) => {
                    request.learning_theme = Some(theme.to_string());
                    println!("Learning theme set to {}", theme);
                }
                None => println!("Usage: learn <theme|none>"),
            },
            "enable" => {
                if parts.len() < 2 {
                    println!("Usage: enable <json>   e.g. enable [\"k1\"]  or  enable \"*\"");
                    continue;
                }
                store
                    .set_config_value(config.feature_flag_key.clone(), parts[1..].join(" "))
                    .await;
                gate.cache().reset().await;
                println!("Flag {} updated.", config.feature_flag_key);
            }
            "gate" => {
                let enabled = gate.is_enabled(&request.person_id).await;
                println!(
                    "Emotion flow is {} for {}",
                    if enabled { "enabled" } else { "disabled" },
                    request.person_id
                );
            }
            "fail" => match parts.get(1) {
                Some(&"on") => {
                    store.set_failing(true);
                    println!("Every store read now fails.");
                }
                Some(&"off") => {
                    store.set_failing(false);
                    println!("Store reads restored.");
                }
                _ => println!("Usage: fail <on|off>"),
            },
            "seed" => match parts.get(1).map(|s| s.parse::<u64>()) {
                Some(Ok(s)) => {
                    rng = StdRng::seed_from_u64(s);
                    println!("Seed set to {}", s);
                }
                Some(Err(_)) => println!("Invalid seed: {}", parts[1]),
                None => println!("Usage: seed <n>"),
            },
            _ => println!("Unknown command: {}. Type 'help' for commands.", cmd),
        }
    }
}

fn parse_mode(label: &str) -> Option<CharacterMode> {
    match label {
        "surprise" => Some(CharacterMode::Surprise),
        "self" => Some(CharacterMode::SelfInsert),
        "family" => Some(CharacterMode::Family),
        _ => None,
    }
}

fn print_result(result: &EmotionFlowResult) {
    println!("\n--- Selections ---");
    println!("intensity:   {}", result.intensity);
    println!(
        "blueprint:   {}",
        result.metadata.blueprint_key.as_deref().unwrap_or("-")
    );
    println!("tone:        {}", result.tone);
    println!(
        "protagonist: {}",
        result.metadata.protagonist_key.as_deref().unwrap_or("-")
    );
    println!("sidekick:    {}", result.metadata.sidekick_key);
    println!(
        "antagonist:  {}",
        result.metadata.antagonist_key.as_deref().unwrap_or("-")
    );
    for (element_type, key) in &result.metadata.element_keys {
        println!("{:<12} {}", format!("{}:", element_type), key);
    }
    println!("\n--- Prompt Blocks ---");
    for block in result.blocks.ordered_for_prompt() {
        if !block.is_empty() {
            println!("{}\n", block);
        }
    }
    println!("--- End ---\n");
}

async fn run_bulk(
    engine: &FlowEngine,
    store: &MemoryStore,
    request: &FlowRequest,
    rng: &mut StdRng,
    count: usize,
) {
    let mut intensities: BTreeMap<String, usize> = BTreeMap::new();
    let mut tones: BTreeMap<String, usize> = BTreeMap::new();
    let mut blueprints: BTreeMap<String, usize> = BTreeMap::new();
    let mut sidekicks: BTreeMap<String, usize> = BTreeMap::new();
    let mut repeats = 0;
    let mut previous_blueprint: Option<String> = None;
    let mut errors = 0;

    store.reset_reads();
    for _ in 0..count {
        let result = match engine.run_with_rng(request, rng).await {
            Ok(result) => result,
            Err(_) => {
                errors += 1;
                continue;
            }
        };
        let metadata = &result.metadata;
        *intensities.entry(metadata.intensity.to_string()).or_default() += 1;
        *tones.entry(metadata.tone.to_string()).or_default() += 1;
        *sidekicks.entry(metadata.sidekick_key.clone()).or_default() += 1;
        let blueprint = metadata.blueprint_key.clone();
        *blueprints
            .entry(blueprint.clone().unwrap_or_else(|| "(none)".to_string()))
            .or_default() += 1;
        if blueprint.is_some() && blueprint == previous_blueprint {
            repeats += 1;
        }
        previous_blueprint = blueprint;

        let record = metadata.to_history_record(&request.person_id, Utc::now());
        if let Err(e) = store.append(record).await {
            println!("Could not record history: {}", e);
        }
    }

    println!("\n=== Bulk: {} runs ({} errors) ===\n", count - errors, errors);
    print_counts("Intensity", &intensities, count);
    print_counts("Tone", &tones, count);
    print_counts("Blueprint", &blueprints, count);
    print_counts("Sidekick", &sidekicks, count);
    println!("Back-to-back blueprint repeats: {}", repeats);

    let reads = store.reads();
    println!(
        "Store reads: {} total ({} per run)",
        reads.total(),
        reads.total() as f64 / count as f64
    );
    println!();
}

fn print_counts(title: &str, counts: &BTreeMap<String, usize>, total: usize) {
    println!("{}:", title);
    for (key, n) in counts {
        println!(
            "  {:<28} {:>5}  {:>5.1}%",
            key,
            n,
            *n as f64 * 100.0 / total as f64
        );
    }
}

fn print_usage() {
    println!("Usage: preview --catalog <path> [--config <path>] [--seed <n>]");
    println!();
    println!("Options:");
    println!("  --catalog <path>  RON catalog of blueprints, seeds and elements");
    println!("  --config <path>   RON engine config");
    println!("  --seed <n>        RNG seed (default: 42)");
}

fn print_help() {
    println!("Commands:");
    println!("  run                         Run once and print blocks and metadata");
    println!("  bulk <n>                    Run n times, recording history, and print stats");
    println!("  person <id>                 Set the person id");
    println!("  age <6-7|8-9|10-11>         Set the age group");
    println!("  theme <name>                Set the theme");
    println!("  mode <surprise|self|family> Set the character mode");
    println!("  name <name> [age]           Set the reader's name and age");
    println!("  costar <name> <relation>    Add a co-star (family mode)");
    println!("  learn <theme|none>          Set or clear the learning theme");
    println!("  enable <json>               Set the enabled-ids flag value");
    println!("  gate                        Check the feature gate for the person");
    println!("  fail <on|off>               Make every store read fail");
    println!("  seed <n>                    Set RNG seed");
    println!("  help                        Show this help");
    println!("  quit                        Exit");
}
