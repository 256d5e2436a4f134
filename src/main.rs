use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aula::error::AppError;
use aula::models::{ModuleTarget, Session, SubmissionStatus};
use aula::services::grades::{self, GradeFilter};
use aula::services::html::{preview, strip_html};
use aula::services::submission::stage_file;
use aula::services::timeline::{self, TimeWindow, TimelineEntry};
use aula::services::{AuthService, ForumService, StatusReconciler, SubmissionDraft, SubmissionService};
use aula::{AppState, ClientConfig};

#[derive(Parser, Debug)]
#[command(name = "aula", version, about = "Moodle courses, assignments and forums from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Log in and keep the session on this device
    Login { username: String, password: String },
    /// Find the Moodle username registered for a Google email
    GoogleLink { email: String },
    Logout,
    Whoami,
    /// List enrolled courses
    Courses,
    /// Course timeline grouped by day
    Contents {
        #[arg(value_parser = positive_id)]
        course_id: i64,
        /// all, overdue or <N>days
        #[arg(value_parser = parse_window, default_value = "all")]
        window: TimeWindow,
    },
    /// Print where a course module leads
    Open {
        #[arg(value_parser = positive_id)]
        course_id: i64,
        #[arg(value_parser = positive_id)]
        module_id: i64,
    },
    Grades {
        #[arg(value_parser = positive_id)]
        course_id: i64,
        /// all, graded or ungraded
        #[arg(value_parser = parse_filter, default_value = "all")]
        filter: GradeFilter,
    },
    /// What the server has for an assignment
    Status {
        #[arg(value_parser = positive_id)]
        assign_id: i64,
    },
    /// Save text and/or a file, optionally handing it in
    Submit {
        #[arg(value_parser = positive_id)]
        assign_id: i64,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Submit for grading after saving
        #[arg(long = "final")]
        finalize: bool,
    },
    Discussions {
        #[arg(value_parser = positive_id)]
        forum_id: i64,
    },
    Posts {
        #[arg(value_parser = positive_id)]
        discussion_id: i64,
    },
    /// Reply to the latest post of a discussion
    Reply {
        #[arg(value_parser = positive_id)]
        discussion_id: i64,
        subject: String,
        message: String,
    },
    /// Download a Moodle file through the proxy
    Download { url: String, out: PathBuf },
}

fn positive_id(raw: &str) -> Result<i64, String> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("expected a positive number, got {}", raw)),
    }
}

fn parse_window(raw: &str) -> Result<TimeWindow, String> {
    raw.parse().map_err(|e: AppError| e.to_string())
}

fn parse_filter(raw: &str) -> Result<GradeFilter, String> {
    raw.parse().map_err(|e: AppError| e.to_string())
}

fn print_status(assign_id: i64, report: &aula::services::StatusReport) {
    println!("assignment {}", assign_id);
    println!("  status:          {}", report.status.label());
    println!("  submission type: {}", report.capabilities.label());
    if report.last_text.is_empty() {
        println!("  last saved text: (empty)");
    } else {
        println!("  last saved text: \"{}\"", preview(&report.last_text, 60));
    }
    for file in &report.files {
        println!("  file:            {}", file.filename);
    }
    if report.capabilities.is_empty() {
        println!("  no submission type detected; check the assignment settings in Moodle");
    }
}

async fn run(state: AppState, command: Command) -> Result<(), AppError> {
    let auth = AuthService::new(state.db.clone(), state.api.clone());

    let session: Session = match &command {
        Command::Login { username, password } => {
            let session = auth.login(username, password).await?;
            println!("Welcome, {}.", session.display_name());
            return Ok(());
        }
        Command::GoogleLink { email } => {
            let account = auth.google_link(email).await?;
            println!(
                "{} belongs to Moodle user '{}'. Log in with that username and your Moodle password.",
                account.email, account.username
            );
            return Ok(());
        }
        Command::Logout => {
            auth.logout().await?;
            println!("Logged out.");
            return Ok(());
        }
        _ => auth.restore().await?,
    };
    let api = state.api.clone();

    match command {
        Command::Login { .. } | Command::GoogleLink { .. } | Command::Logout => {}
        Command::Whoami => {
            println!("{} ({}), user id {}", session.display_name(), session.username, session.user_id);
        }
        Command::Courses => {
            let courses = api.fetch_courses(&session).await?;
            if courses.is_empty() {
                println!("You are not enrolled in any course yet.");
            }
            for course in courses {
                println!("{:>6}  {}  [{}]", course.id, course.fullname, course.shortname);
            }
        }
        Command::Contents { course_id, window } => {
            let (sections, assignments, forums) = tokio::try_join!(
                api.fetch_course_contents(&session, course_id),
                api.fetch_assignments(&session, course_id),
                api.fetch_forums(&session, course_id),
            )?;
            let entries = timeline::build_timeline(
                &sections,
                &assignments,
                &forums,
                window,
                Utc::now(),
                &Local,
            );
            if entries.is_empty() {
                println!("No contents.");
            }
            for entry in entries {
                match entry {
                    TimelineEntry::Header(day) => println!("\n== {} ==", day.format("%a %d %b %Y")),
                    TimelineEntry::Item(item) => {
                        let when = item
                            .display_date
                            .map(|d| d.with_timezone(&Local).format("%H:%M").to_string())
                            .unwrap_or_else(|| "--:--".to_string());
                        println!(
                            "{} {}  {}  (module {}, {} {})",
                            when,
                            item.kind.icon(),
                            item.module.name,
                            item.module.id,
                            item.kind.modname(),
                            item.module.instance.unwrap_or_default()
                        );
                    }
                }
            }
        }
        Command::Open { course_id, module_id } => {
            let sections = api.fetch_course_contents(&session, course_id).await?;
            let module = sections
                .iter()
                .flat_map(|s| s.modules.iter())
                .find(|m| m.id == module_id)
                .ok_or_else(|| {
                    AppError::InvalidInput(format!("module {} not found in course {}", module_id, course_id))
                })?;
            match module.target(&state.config.api_base_url)? {
                ModuleTarget::Assignment { id, name } => println!("assignment {}: aula status {}", name, id),
                ModuleTarget::Forum { id, name } => println!("forum {}: aula discussions {}", name, id),
                ModuleTarget::Link(url) | ModuleTarget::ProxiedFile(url) => println!("{}", url),
            }
        }
        Command::Grades { course_id, filter } => {
            let items = api.fetch_grades(&session, course_id).await?;
            let summary = grades::summarize(&items);
            println!(
                "{} graded of {} items, course total: {}",
                summary.graded_items,
                summary.total_items,
                summary.course_total.as_deref().unwrap_or("-")
            );
            for item in grades::filter_grades(&items, filter) {
                let grade = if grades::is_graded(item) { item.grade_text.as_str() } else { "-" };
                let marker = if item.is_course_total { "*" } else { " " };
                println!("{} {:<50} {}", marker, item.name, grade);
                if !item.feedback_text.is_empty() {
                    println!("    💬 {}", item.feedback_text);
                }
            }
        }
        Command::Status { assign_id } => {
            let report = StatusReconciler::new(api.clone()).reconcile(&session, assign_id).await?;
            print_status(assign_id, &report);
        }
        Command::Submit { assign_id, text, file, finalize } => {
            let reconciler = StatusReconciler::new(api.clone());
            let report = reconciler.reconcile(&session, assign_id).await?;

            let mut draft = SubmissionDraft::new();
            if let Some(text) = text {
                draft.set_text(text);
            }
            if let Some(path) = file {
                draft.set_file(Some(stage_file(&path).await?));
            }

            let service = SubmissionService::new(api.clone());
            let outcome = service
                .submit(&session, assign_id, report.capabilities, &mut draft)
                .await?;
            if outcome.text_ack.is_some() {
                println!("Text saved.");
            }
            if outcome.file_ack.is_some() {
                println!("File uploaded.");
            }
            if finalize {
                service.finalize(&session, assign_id).await?;
                println!("Submitted for grading.");
            }

            let report = reconciler.reconcile(&session, assign_id).await?;
            print_status(assign_id, &report);
            if report.status == SubmissionStatus::Pending && !finalize {
                println!("  run again with --final to hand it in");
            }
        }
        Command::Discussions { forum_id } => {
            let discussions = api.fetch_discussions(&session, forum_id).await?;
            if discussions.is_empty() {
                println!("No visible discussions.");
            }
            for d in discussions {
                let created = d
                    .created
                    .map(|c| c.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let pin = if d.pinned { "📌 " } else { "" };
                println!("[{}] {}{}  by {} {}", d.discussion_id, pin, d.subject, d.author, created);
                println!("    {}", preview(&d.message, 120));
            }
        }
        Command::Posts { discussion_id } => {
            let forum = ForumService::new(api.clone());
            match forum.thread(&session, discussion_id).await? {
                None => println!("No posts."),
                Some(thread) => {
                    for (depth, post) in thread.root.walk() {
                        let indent = "  ".repeat(depth);
                        let created = post
                            .created
                            .map(|c| c.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_default();
                        println!("{}{} by {} {}", indent, post.subject, post.author, created);
                        println!("{}  {}", indent, strip_html(&post.message));
                    }
                    for post in thread.orphans {
                        println!("(reply to a hidden post) {} by {}", post.subject, post.author);
                    }
                }
            }
        }
        Command::Reply { discussion_id, subject, message } => {
            ForumService::new(api.clone())
                .reply(&session, discussion_id, &subject, &message)
                .await?;
            println!("Reply sent.");
        }
        Command::Download { url, out } => {
            let bytes = api.download(&session, &url).await?;
            tokio::fs::write(&out, &bytes).await?;
            println!("Saved {} bytes to {}", bytes.len(), out.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aula=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = async {
        let config = ClientConfig::new_from_env()?;
        let state = AppState::connect(config).await?;
        run(state, cli.command).await
    }
    .await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            if e.is_auth() {
                eprintln!("{}\nLog in again with: aula login <username> <password>", e);
            } else {
                eprintln!("{}", e);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("aula").chain(args.iter().copied())).map(|cli| cli.command)
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_submit_flags() {
        let command = parse(&["submit", "12", "--text", "<p>Hola</p>", "--final"]).unwrap();
        assert_eq!(
            command,
            Command::Submit {
                assign_id: 12,
                text: Some("<p>Hola</p>".to_string()),
                file: None,
                finalize: true,
            }
        );
    }

    #[test]
    fn contents_window_defaults_to_all() {
        assert_eq!(
            parse(&["contents", "3"]).unwrap(),
            Command::Contents { course_id: 3, window: TimeWindow::All }
        );
        assert_eq!(
            parse(&["contents", "3", "7days"]).unwrap(),
            Command::Contents { course_id: 3, window: TimeWindow::NextDays(7) }
        );
        assert!(parse(&["contents", "3", "soon"]).is_err());
    }

    #[test]
    fn google_link_is_kebab_case() {
        assert_eq!(
            parse(&["google-link", "ana@example.edu"]).unwrap(),
            Command::GoogleLink { email: "ana@example.edu".to_string() }
        );
    }

    #[test]
    fn grade_filter_is_validated() {
        assert_eq!(
            parse(&["grades", "4", "ungraded"]).unwrap(),
            Command::Grades { course_id: 4, filter: GradeFilter::Ungraded }
        );
        assert!(parse(&["grades", "4", "best"]).is_err());
    }

    #[test]
    fn ids_must_be_positive() {
        assert!(parse(&["status", "0"]).is_err());
        assert!(parse(&["status"]).is_err());
        assert!(parse(&["status", "abc"]).is_err());
        assert!(parse(&["status", "-2"]).is_err());
    }
}
