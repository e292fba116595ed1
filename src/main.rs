use clap::Parser;
use std::path::Path;
use tagmerge::application::{
    prepare_adoption, AdoptionOutcome, CommandContext, CommandDispatcher, CompareService,
    DirtyFlag, DirtyTracker,
};
use tagmerge::cli::{format_comparison_summary, format_tag_list, Cli, Commands};
use tagmerge::domain::alignment::AlignPolicy;
use tagmerge::domain::{Document, TagManager};
use tagmerge::error::Result;
use tagmerge::infrastructure::{Config, DocumentStore};

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e.display_with_suggestions());
            std::process::exit(e.exit_code());
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path } => {
            let config = Config::new(AlignPolicy::Union);
            config.save_to_dir(&path)?;
            let tag_types: Vec<&str> = config.tags.tag_types().collect();
            println!("Initialized tagmerge project in {}", path.display());
            println!("Configured tag types: {}", tag_types.join(", "));
            Ok(())
        }
        Commands::Tags { file } => {
            let config = Config::load_from_dir(Path::new("."))?;
            let manager = TagManager::new(&config.tags);
            let store = DocumentStore::new(&manager);

            let document = store.load_document(&file)?;
            print!("{}", format_tag_list(document.tags()));
            Ok(())
        }
        Commands::Show { file } => {
            let config = Config::load_from_dir(Path::new("."))?;
            let manager = TagManager::new(&config.tags);
            let store = DocumentStore::new(&manager);

            let document = store.load_document(&file)?;
            println!(
                "{}",
                manager.processor().delete_all_tags_from_text(document.text())
            );
            Ok(())
        }
        Commands::Compare { files, output } => {
            let config = Config::load_from_dir(Path::new("."))?;
            let manager = TagManager::new(&config.tags);
            let store = DocumentStore::new(&manager);

            let documents = files
                .iter()
                .map(|file| store.load_document(file))
                .collect::<Result<Vec<Document>>>()?;

            let file_name = output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let service = CompareService::new(&manager, config.align_option);
            let model = service.compare(&file_name, &documents)?;
            store.save_comparison(&model, &output)?;

            print!("{}", format_comparison_summary(&model));
            println!("Comparison written to {}", output.display());
            Ok(())
        }
        Commands::Adopt {
            file,
            annotator,
            unit,
        } => {
            let config = Config::load_from_dir(Path::new("."))?;
            let manager = TagManager::new(&config.tags);
            let store = DocumentStore::new(&manager);

            let mut model = store.load_comparison(&file)?;
            if let Some(unit) = unit {
                model.set_current_index(unit)?;
                model.update_panels(&manager);
            }

            match prepare_adoption(&model, &manager, annotator)? {
                AdoptionOutcome::Refused(reason) => {
                    println!("Adoption refused: {}", reason);
                    Ok(())
                }
                AdoptionOutcome::Ready(command) => {
                    let dirty = DirtyFlag::new();
                    let mut dispatcher = CommandDispatcher::new();
                    dispatcher.register_effect(Box::new(DirtyTracker::new(dirty.clone())));

                    let mut ctx = CommandContext {
                        model: &mut model,
                        manager: &manager,
                    };
                    dispatcher.execute(Box::new(command), &mut ctx)?;

                    if dirty.is_dirty() {
                        store.save_comparison(&model, &file)?;
                    }
                    println!(
                        "Adopted annotator {}'s sentence into the merged document",
                        annotator
                    );
                    Ok(())
                }
            }
        }
    }
}
