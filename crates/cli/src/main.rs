use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trauma_baas::backend_for;
use trauma_core::config::core_config_from_env_values;
use trauma_core::display::{age_display, format_injury_datetime, injury_day};
use trauma_core::{
    Admission, AdmissionFilter, AdmissionService, AdmissionStatus, Backend, CoreConfig,
    EnvValues, PageRequest, Patient, PatientService, Session, SessionContext, TraumaError,
    TraumaResult,
};

#[derive(Parser)]
#[command(name = "trauma")]
#[command(about = "Trauma One admission record manager CLI")]
struct Cli {
    /// Access token from `trauma login`
    #[arg(long, global = true, env = "TRAUMA_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and print an access token
    Login {
        /// Account email
        email: String,
        /// Account password
        #[arg(long, env = "TRAUMA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session
    Logout,
    /// Patient registry
    #[command(subcommand)]
    Patients(PatientCommands),
    /// Admissions registry
    #[command(subcommand)]
    Admissions(AdmissionCommands),
    /// Age in whole years for a birthdate
    Age {
        /// Birthdate (YYYY-MM-DD)
        birthdate: String,
        /// Compute as of this date instead of today (YYYY-MM-DD)
        #[arg(long)]
        as_of: Option<String>,
    },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List patients, newest first
    List {
        /// Name or registration number fragment
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one patient
    Show { id: String },
    /// List every admission of a patient
    History { id: String },
}

#[derive(Subcommand)]
enum AdmissionCommands {
    /// List admissions, newest first
    List {
        /// Patient name or registration number fragment
        #[arg(long)]
        search: Option<String>,
        /// Date of injury (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// ADMITTED or DISCHARGED
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one admission
    Show { id: String },
    /// Discharge an admission
    Discharge { id: String },
    /// Print the chat summary of an admission
    Summary { id: String },
}

fn parse_date(value: &str, what: &str) -> TraumaResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| TraumaError::InvalidInput(format!("{what} must be YYYY-MM-DD, got '{value}'")))
}

fn patient_line(patient: &Patient, today: NaiveDate) -> String {
    format!(
        "ID: {}, Name: {}, Sex: {}, Age: {}, Reg: {}",
        patient.id,
        patient.full_name(),
        patient.sex,
        age_display(patient.birthdate, today),
        patient.hospital_registration_number.as_deref().unwrap_or("-"),
    )
}

fn admission_line(admission: &Admission, today: NaiveDate) -> String {
    let injury = &admission.clinical.injury;
    let patient = admission
        .patient
        .as_ref()
        .map(Patient::full_name)
        .unwrap_or_else(|| admission.patient_id.clone());
    let day = injury_day(injury.date_of_injury, today)
        .map(|d| format!(" (day {d})"))
        .unwrap_or_default();
    format!(
        "ID: {}, Patient: {}, Status: {}, Complaint: {}, Injury: {}{}",
        admission.id,
        patient,
        admission.status,
        injury.chief_complaint,
        format_injury_datetime(injury.date_of_injury, injury.time_of_injury),
        day,
    )
}

/// Runs a protected operation: applies the route guard, then tears the session down if the
/// store reports it expired.
async fn guarded<T, F, Fut>(ctx: &SessionContext, token: Option<String>, op: F) -> TraumaResult<T>
where
    F: FnOnce(Session) -> Fut,
    Fut: Future<Output = TraumaResult<T>>,
{
    ctx.init(token.map(Session::from_access_token)).await;
    let session = ctx.guard().await?;
    ctx.observe(op(session).await).await
}

async fn run(
    cli: Cli,
    cfg: Arc<CoreConfig>,
    backend: Arc<dyn Backend>,
) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = SessionContext::new(backend.auth());
    let today = Local::now().date_naive();
    let token = cli.token;

    match cli.command {
        Some(Commands::Login { email, password }) => {
            let session = ctx.sign_in(&email, &password).await?;
            println!("{}", session.access_token);
            if let Some(expires_at) = session.expires_at {
                eprintln!("Signed in; session expires at {}", expires_at.to_rfc3339());
            }
        }
        Some(Commands::Logout) => {
            ctx.init(token.map(Session::from_access_token)).await;
            ctx.sign_out().await;
            println!("Signed out.");
        }
        Some(Commands::Patients(command)) => {
            let patients = |session: Session| {
                PatientService::for_session(cfg.clone(), backend.as_ref(), &session)
            };
            match command {
                PatientCommands::List { search, page } => {
                    let result = guarded(&ctx, token, |s| async move {
                        patients(s)
                            .list(search.as_deref(), PageRequest::patients(page))
                            .await
                    })
                    .await?;
                    if result.rows.is_empty() {
                        println!("No patients found.");
                    }
                    for patient in &result.rows {
                        println!("{}", patient_line(patient, today));
                    }
                    println!(
                        "Page {} of {} ({} patients)",
                        result.page,
                        result.total_pages(),
                        result.total_count
                    );
                }
                PatientCommands::Show { id } => {
                    let patient =
                        guarded(&ctx, token, |s| async move { patients(s).get(&id).await }).await?;
                    println!("{}", patient_line(&patient, today));
                    println!(
                        "Birthdate: {}, Blood type: {}",
                        patient
                            .birthdate
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".into()),
                        patient
                            .blood_type
                            .map(|b| b.to_string())
                            .unwrap_or_else(|| "-".into()),
                    );
                }
                PatientCommands::History { id } => {
                    let admissions = guarded(&ctx, token, |s| async move {
                        patients(s).admission_history(&id).await
                    })
                    .await?;
                    if admissions.is_empty() {
                        println!("No admissions found.");
                    }
                    for admission in &admissions {
                        println!("{}", admission_line(admission, today));
                    }
                }
            }
        }
        Some(Commands::Admissions(command)) => {
            let admissions =
                |session: Session| AdmissionService::for_session(backend.as_ref(), &session);
            match command {
                AdmissionCommands::List {
                    search,
                    date,
                    status,
                    page,
                } => {
                    let filter = AdmissionFilter {
                        free_text: search,
                        date_of_injury: date
                            .as_deref()
                            .map(|d| parse_date(d, "--date"))
                            .transpose()?,
                        status: status
                            .as_deref()
                            .map(str::parse::<AdmissionStatus>)
                            .transpose()
                            .map_err(TraumaError::InvalidInput)?,
                    };
                    let result = guarded(&ctx, token, |s| async move {
                        admissions(s)
                            .list(&filter, PageRequest::admissions(page))
                            .await
                    })
                    .await?;
                    if result.rows.is_empty() {
                        println!("No admissions found.");
                    }
                    for admission in &result.rows {
                        println!("{}", admission_line(admission, today));
                    }
                    println!(
                        "Page {} of {} ({} admissions)",
                        result.page,
                        result.total_pages(),
                        result.total_count
                    );
                }
                AdmissionCommands::Show { id } => {
                    let admission =
                        guarded(&ctx, token, |s| async move { admissions(s).get(&id).await })
                            .await?;
                    println!("{}", admission_line(&admission, today));
                    if let Some(severity) = &admission.clinical.severity {
                        println!("Severity: {severity}");
                    }
                }
                AdmissionCommands::Discharge { id } => {
                    let admission = guarded(&ctx, token, |s| async move {
                        admissions(s).discharge(&id).await
                    })
                    .await?;
                    println!("Admission {} is {}", admission.id, admission.status);
                }
                AdmissionCommands::Summary { id } => {
                    let text = guarded(&ctx, token, |s| async move {
                        admissions(s).summary(&id, today).await
                    })
                    .await?;
                    print!("{text}");
                }
            }
        }
        Some(Commands::Age { birthdate, as_of }) => {
            let birthdate = parse_date(&birthdate, "birthdate")?;
            let as_of = match as_of {
                Some(d) => parse_date(&d, "--as-of")?,
                None => today,
            };
            println!("{}", age_display(Some(birthdate), as_of));
        }
        None => {
            println!("Use 'trauma --help' for commands");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trauma=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(core_config_from_env_values(EnvValues::from_env())?);
    let backend = backend_for(&cfg, None)?;

    match run(cli, cfg, backend).await {
        Err(e) if is_expired(e.as_ref()) => {
            eprintln!("Session expired. Please sign in again with 'trauma login'.");
            Err(e)
        }
        other => other,
    }
}

fn is_expired(err: &(dyn std::error::Error + 'static)) -> bool {
    err.downcast_ref::<TraumaError>()
        .is_some_and(TraumaError::is_session_expired)
}
