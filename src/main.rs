use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod attendance;
mod config;
mod db;
mod error;
mod models;
mod report;
mod timetable;

use config::Config;
use models::{AttendanceEntry, NewSemester, NewSlot, NewSubject, SubjectChanges};

#[derive(Parser)]
#[command(name = "attendance-tracker")]
#[command(about = "Track semester attendance and see how many lectures you can miss", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a sample semester with subjects, timetable and attendance
    Seed,
    /// Manage semesters
    Semester {
        #[command(subcommand)]
        action: SemesterCommand,
    },
    /// Manage subjects of the active semester
    Subject {
        #[command(subcommand)]
        action: SubjectCommand,
    },
    /// Manage the weekly timetable of the active semester
    Timetable {
        #[command(subcommand)]
        action: TimetableCommand,
    },
    /// Record daily attendance
    Attendance {
        #[command(subcommand)]
        action: AttendanceCommand,
    },
    /// Show attendance and guidance per subject
    Dashboard {
        #[arg(long)]
        target: Option<f64>,
    },
    /// Generate a markdown attendance report
    Report {
        #[arg(long)]
        target: Option<f64>,
        #[arg(long, default_value = "attendance-report.md")]
        out: PathBuf,
    },
    /// Write attendance percentages as JSON (stdout when no --out)
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SemesterCommand {
    /// List all semesters
    List,
    /// Add a semester
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// Make this the active semester
        #[arg(long)]
        active: bool,
    },
    /// Make a semester the active one
    Activate { id: Uuid },
}

#[derive(Subcommand)]
enum SubjectCommand {
    /// List subjects of the active semester
    List,
    /// Add a subject to the active semester
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        code: String,
        #[arg(long, default_value_t = 3)]
        credits: i32,
        #[arg(long, default_value_t = 60)]
        total_lectures: i32,
    },
    /// Change fields of a subject
    Edit {
        id: Uuid,
        #[command(flatten)]
        changes: SubjectEdit,
    },
    /// Delete a subject with its timetable and attendance
    Delete { id: Uuid },
}

#[derive(Args)]
struct SubjectEdit {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    code: Option<String>,
    #[arg(long)]
    credits: Option<i32>,
    #[arg(long)]
    total_lectures: Option<i32>,
}

#[derive(Subcommand)]
enum TimetableCommand {
    /// Show the weekly timetable
    Show,
    /// Add a weekly slot
    Add {
        #[arg(long)]
        subject: Uuid,
        /// 0-6 (Monday first) or a day name
        #[arg(long, value_parser = parse_day)]
        day: i16,
        #[arg(long, value_parser = parse_clock)]
        start: chrono::NaiveTime,
        #[arg(long, value_parser = parse_clock)]
        end: chrono::NaiveTime,
        #[arg(long)]
        room: Option<String>,
    },
    /// Remove a slot
    Remove { id: Uuid },
}

#[derive(Subcommand)]
enum AttendanceCommand {
    /// Show what is recorded for a day
    Show {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Record a day: listed subjects attended, every other subject missed
    Mark {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        present: Vec<Uuid>,
        /// Note for a subject, as SUBJECT_ID=TEXT
        #[arg(long, value_parser = parse_note)]
        note: Vec<(Uuid, String)>,
    },
    /// Import records from a CSV file (subject_code,date,attended,notes)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
}

fn parse_day(value: &str) -> Result<i16, String> {
    timetable::parse_weekday(value).map_err(|err| err.to_string())
}

fn parse_clock(value: &str) -> Result<chrono::NaiveTime, String> {
    timetable::parse_time(value).map_err(|err| err.to_string())
}

fn parse_note(value: &str) -> Result<(Uuid, String), String> {
    let (id, text) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SUBJECT_ID=TEXT, got {value}"))?;
    let id = Uuid::parse_str(id.trim()).map_err(|err| format!("invalid subject id: {err}"))?;
    Ok((id, text.trim().to_string()))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attendance_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    tracing::debug!(max_connections = config.max_connections, "database pool ready");

    run(cli.command, &pool, &config).await
}

async fn run(command: Commands, pool: &PgPool, config: &Config) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Semester { action } => run_semester(action, pool).await?,
        Commands::Subject { action } => run_subject(action, pool).await?,
        Commands::Timetable { action } => run_timetable(action, pool).await?,
        Commands::Attendance { action } => run_attendance(action, pool).await?,
        Commands::Dashboard { target } => {
            let target = resolve_target(target, config)?;
            let Some(semester) = db::active_semester(pool).await? else {
                println!("No active semester. Add one with `semester add --active`.");
                return Ok(());
            };
            let subjects = db::records_by_subject(pool, semester.id).await?;
            let (summaries, aggregate) = report::summarize_all(&subjects, target);
            print!(
                "{}",
                report::render_dashboard(&semester, &summaries, aggregate, target)
            );
        }
        Commands::Report { target, out } => {
            let target = resolve_target(target, config)?;
            let semester = db::require_active_semester(pool).await?;
            let subjects = db::records_by_subject(pool, semester.id).await?;
            let report = report::build_report(&semester, target, &subjects);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { out } => {
            let export = match db::active_semester(pool).await? {
                Some(semester) => {
                    let subjects = db::records_by_subject(pool, semester.id).await?;
                    let (summaries, aggregate) = report::summarize_all(&subjects, config.target);
                    report::attendance_export(&summaries, aggregate)
                }
                None => report::no_active_semester_export(),
            };
            let json = serde_json::to_string_pretty(&export)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Export written to {}.", path.display());
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

fn resolve_target(flag: Option<f64>, config: &Config) -> anyhow::Result<f64> {
    match flag {
        Some(value) => Ok(config::validate_target(value)?),
        None => Ok(config.target),
    }
}

async fn run_semester(action: SemesterCommand, pool: &PgPool) -> anyhow::Result<()> {
    match action {
        SemesterCommand::List => {
            let semesters = db::list_semesters(pool).await?;
            if semesters.is_empty() {
                println!("No semesters yet.");
            }
            for semester in semesters {
                println!(
                    "{} {} ({} to {}){}",
                    semester.id,
                    semester.name,
                    semester.start_date,
                    semester.end_date,
                    if semester.is_active { " [active]" } else { "" }
                );
            }
        }
        SemesterCommand::Add {
            name,
            start,
            end,
            active,
        } => {
            let semester = db::create_semester(
                pool,
                &NewSemester {
                    name,
                    start_date: start,
                    end_date: end,
                    is_active: active,
                },
            )
            .await?;
            println!("Semester {} added ({}).", semester.name, semester.id);
        }
        SemesterCommand::Activate { id } => {
            let semester = db::activate_semester(pool, id).await?;
            println!("Semester \"{}\" activated.", semester.name);
        }
    }
    Ok(())
}

async fn run_subject(action: SubjectCommand, pool: &PgPool) -> anyhow::Result<()> {
    match action {
        SubjectCommand::List => {
            let semester = db::require_active_semester(pool).await?;
            let subjects = db::list_subjects(pool, semester.id).await?;
            println!("Subjects in {}:", semester.name);
            if subjects.is_empty() {
                println!("No subjects yet.");
            }
            for subject in subjects {
                println!(
                    "- {} {} {} ({} credits, {} lectures planned)",
                    subject.id, subject.code, subject.name, subject.credits, subject.total_lectures
                );
            }
        }
        SubjectCommand::Add {
            name,
            code,
            credits,
            total_lectures,
        } => {
            let semester = db::require_active_semester(pool).await?;
            let subject = db::create_subject(
                pool,
                semester.id,
                &NewSubject {
                    name,
                    code,
                    credits,
                    total_lectures,
                },
            )
            .await?;
            println!("Subject {} added ({}).", subject.code, subject.id);
        }
        SubjectCommand::Edit { id, changes } => {
            let subject = db::update_subject(
                pool,
                id,
                &SubjectChanges {
                    name: changes.name,
                    code: changes.code,
                    credits: changes.credits,
                    total_lectures: changes.total_lectures,
                },
            )
            .await?;
            println!("Subject {} updated.", subject.code);
        }
        SubjectCommand::Delete { id } => {
            db::delete_subject(pool, id).await?;
            println!("Subject deleted.");
        }
    }
    Ok(())
}

async fn run_timetable(action: TimetableCommand, pool: &PgPool) -> anyhow::Result<()> {
    match action {
        TimetableCommand::Show => {
            let semester = db::require_active_semester(pool).await?;
            let days = timetable::group_by_day(db::list_slots(pool, semester.id).await?);
            if days.is_empty() {
                println!("No timetable slots yet.");
            }
            for (day, entries) in days {
                println!("{}:", timetable::weekday_name(day).unwrap_or("?"));
                for entry in entries {
                    println!(
                        "  {}-{} {} {}{} [{}]",
                        entry.slot.start_time.format("%H:%M"),
                        entry.slot.end_time.format("%H:%M"),
                        entry.subject_code,
                        entry.subject_name,
                        entry
                            .slot
                            .room
                            .as_deref()
                            .map(|room| format!(" in {room}"))
                            .unwrap_or_default(),
                        entry.slot.id
                    );
                }
            }
        }
        TimetableCommand::Add {
            subject,
            day,
            start,
            end,
            room,
        } => {
            let slot = db::create_slot(
                pool,
                &NewSlot {
                    subject_id: subject,
                    day_of_week: day,
                    start_time: start,
                    end_time: end,
                    room,
                },
            )
            .await?;
            println!("Timetable slot added ({}).", slot.id);
        }
        TimetableCommand::Remove { id } => {
            db::delete_slot(pool, id).await?;
            println!("Timetable slot removed.");
        }
    }
    Ok(())
}

async fn run_attendance(action: AttendanceCommand, pool: &PgPool) -> anyhow::Result<()> {
    match action {
        AttendanceCommand::Show { date } => {
            let date = date.unwrap_or_else(today);
            let semester = db::require_active_semester(pool).await?;
            let subjects = db::list_subjects(pool, semester.id).await?;
            let records = db::records_on(pool, semester.id, date).await?;

            println!("Attendance for {date}:");
            for subject in subjects {
                let status = match records.iter().find(|record| record.subject_id == subject.id) {
                    Some(record) if record.attended => "present".to_string(),
                    Some(record) => match record.notes.as_deref() {
                        Some(notes) if !notes.is_empty() => format!("absent ({notes})"),
                        _ => "absent".to_string(),
                    },
                    None => "not recorded".to_string(),
                };
                println!("- {} {} ({}): {}", subject.code, subject.name, subject.id, status);
            }
        }
        AttendanceCommand::Mark {
            date,
            present,
            note,
        } => {
            let date = date.unwrap_or_else(today);
            let semester = db::require_active_semester(pool).await?;
            let subjects = db::list_subjects(pool, semester.id).await?;

            for id in present.iter().chain(note.iter().map(|(id, _)| id)) {
                if !subjects.iter().any(|subject| subject.id == *id) {
                    return Err(error::TrackerError::NotFound {
                        entity: "subject in active semester",
                        id: *id,
                    }
                    .into());
                }
            }

            let entries = build_entries(&subjects, &present, note);
            let saved = db::save_attendance(pool, date, &entries).await?;
            println!("Attendance saved for {saved} subjects on {date}.");
        }
        AttendanceCommand::Import { csv } => {
            let written = db::import_csv(pool, &csv).await?;
            println!("Imported {written} attendance records from {}.", csv.display());
        }
    }
    Ok(())
}

fn build_entries(
    subjects: &[models::Subject],
    present: &[Uuid],
    notes: Vec<(Uuid, String)>,
) -> Vec<AttendanceEntry> {
    subjects
        .iter()
        .map(|subject| AttendanceEntry {
            subject_id: subject.id,
            attended: present.contains(&subject.id),
            notes: notes
                .iter()
                .rev()
                .find(|(id, _)| *id == subject.id)
                .map(|(_, text)| text.clone())
                .filter(|text| !text.is_empty()),
        })
        .collect()
}
