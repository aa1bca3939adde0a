//! SheetPress CLI - Shop Bridge Interface
//!
//! Commands: sizes, validate, pack, render, print
//! Outputs JSON to stdout
//! Returns non-zero on validation failure

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use sheetpress_core::{
    catalog::SizeCatalog,
    hashing::compute_job_hash,
    job::{JobError, JobRunner, LayoutJob},
    loader::FileImageLoader,
    print::{execute_print, prepare_preview, FilePrintSink},
    render::{download_file_name, encode_png, render_sheet, sheet_manifest},
    ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "sheetpress-cli")]
#[command(about = "SheetPress CLI - Photo Sheet Layout & Print Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a directory with extra catalog JSON files
    #[arg(short, long, default_value = "catalog")]
    catalog_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// List paper and photo sizes
    Sizes,

    /// Validate a layout job
    Validate {
        /// Path to the job JSON file
        #[arg(short, long)]
        job: PathBuf,
    },

    /// Pack a layout job and emit the placed layout
    Pack {
        /// Path to the job JSON file
        #[arg(short, long)]
        job: PathBuf,
    },

    /// Render a layout job to a PNG sheet
    Render {
        /// Path to the job JSON file
        #[arg(short, long)]
        job: PathBuf,

        /// Directory where source image ids resolve to files
        #[arg(short, long, default_value = ".")]
        images: PathBuf,

        /// Output file (defaults to print-layout-<paper>.png)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render a job and produce the print document
    Print {
        /// Path to the job JSON file
        #[arg(short, long)]
        job: PathBuf,

        /// Directory where source image ids resolve to files
        #[arg(short, long, default_value = ".")]
        images: PathBuf,

        /// Directory for the preview and the print document
        #[arg(short, long, default_value = "print")]
        out_dir: PathBuf,
    },
}

fn job_exit_code(err: &JobError) -> ExitCode {
    match err {
        JobError::Rejected(_) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let catalog = match SizeCatalog::load_from_dir(&cli.catalog_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(r#"{{"error": "Failed to load catalog: {}"}}"#, e);
            return ExitCode::FAILURE;
        }
    };

    let runner = JobRunner::new(catalog);

    match cli.command {
        Commands::Sizes => {
            let output = serde_json::json!({
                "engineVersion": ENGINE_VERSION,
                "papers": runner.catalog().papers(),
                "photoSizes": runner.catalog().photo_sizes(),
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
            ExitCode::SUCCESS
        }

        Commands::Validate { job } => {
            let job = match LayoutJob::from_file(&job) {
                Ok(j) => j,
                Err(e) => {
                    println!(r#"{{"valid": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            match runner.validate(&job) {
                Ok(check) => {
                    println!("{}", serde_json::to_string_pretty(&check).unwrap());
                    if check.valid {
                        ExitCode::SUCCESS
                    } else {
                        ExitCode::from(2) // Validation failure
                    }
                }
                Err(e) => {
                    println!(r#"{{"valid": false, "error": "{}"}}"#, e);
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Pack { job } => {
            let job = match LayoutJob::from_file(&job) {
                Ok(j) => j,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            match runner.run(&job) {
                Ok(session) => {
                    let job_hash = compute_job_hash(&job.paper, &job, ENGINE_VERSION)
                        .unwrap_or_default();
                    let output = serde_json::json!({
                        "success": true,
                        "jobHash": job_hash,
                        "layout": session,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    job_exit_code(&e)
                }
            }
        }

        Commands::Render { job, images, out } => {
            let job = match LayoutJob::from_file(&job) {
                Ok(j) => j,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            let session = match runner.run(&job) {
                Ok(s) => s,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return job_exit_code(&e);
                }
            };

            let loader = FileImageLoader::new(&images);
            let sheet = match render_sheet(&session.placed, &session.paper, &session.config, &loader)
            {
                Ok(s) => s,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };
            let (width_px, height_px) = sheet.dimensions();

            let png = match encode_png(&sheet) {
                Ok(p) => p,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            let out = out.unwrap_or_else(|| PathBuf::from(download_file_name(&session.paper)));
            if let Err(e) = std::fs::write(&out, &png) {
                println!(r#"{{"success": false, "error": "Cannot write {}: {}"}}"#, out.display(), e);
                return ExitCode::FAILURE;
            }

            match sheet_manifest(&session, &png, width_px, height_px) {
                Ok(manifest) => {
                    let output = serde_json::json!({
                        "success": true,
                        "file": out,
                        "manifest": manifest,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Print {
            job,
            images,
            out_dir,
        } => {
            let job = match LayoutJob::from_file(&job) {
                Ok(j) => j,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            let session = match runner.run(&job) {
                Ok(s) => s,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return job_exit_code(&e);
                }
            };

            let loader = FileImageLoader::new(&images);
            let preview = match prepare_preview(&session, &loader) {
                Ok(p) => p,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "{}"}}"#, e);
                    return ExitCode::FAILURE;
                }
            };

            if let Err(e) = std::fs::create_dir_all(&out_dir) {
                println!(r#"{{"success": false, "error": "Cannot create {}: {}"}}"#, out_dir.display(), e);
                return ExitCode::FAILURE;
            }
            let preview_path = out_dir.join(download_file_name(&preview.paper));
            if let Err(e) = std::fs::write(&preview_path, &preview.png) {
                println!(r#"{{"success": false, "error": "Cannot write {}: {}"}}"#, preview_path.display(), e);
                return ExitCode::FAILURE;
            }

            let mut sink = FilePrintSink::new(&out_dir);
            let document_path = sink.document_path(&preview.paper);
            match execute_print(&mut sink, &preview) {
                Ok(()) => {
                    let output = serde_json::json!({
                        "success": true,
                        "preview": preview_path,
                        "document": document_path,
                        "instructions": preview.instructions,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::FAILURE
                }
            }
        }
    }
}
