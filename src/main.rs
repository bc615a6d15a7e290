use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use studio_ia::{
    auth::TokenSource,
    build_client,
    logger::{self, LogLevel, LoggerConfig},
    AspectRatio, Config, FirebaseIdentity, PresentationStyle, Session, Studio, StudioError,
};

#[derive(Parser)]
#[command(name = "studio-ia", version, about = "AI fashion presentations for garment photos")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay endpoint that holds the Gemini key
    #[cfg(feature = "server")]
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate a presentation from a garment photo
    Generate {
        /// Garment image (PNG, JPEG or WebP)
        #[arg(short, long)]
        garment: PathBuf,

        #[arg(short, long, default_value = studio_ia::studio::DEFAULT_BRAND_NAME)]
        brand: String,

        /// Style label or English name, e.g. "Boutique de Luxe" or "Luxury Boutique"
        #[arg(short, long)]
        style: Option<String>,

        /// 9:16 or 16:9
        #[arg(short, long, default_value = "9:16")]
        ratio: String,

        /// Directory the image is written to
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Sign in before calling the relay
        #[arg(long, requires = "password")]
        email: Option<String>,

        #[arg(long, requires = "email", env = "STUDIO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// List the available styles and aspect ratios
    Styles,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();
    let config = Config::from_env();

    let mut logger_config = if config.json_logs {
        LoggerConfig::production()
    } else {
        LoggerConfig::default()
    };
    if cli.verbose {
        logger_config = logger_config.with_level(LogLevel::Debug);
    }
    if let Some(path) = &config.log_file {
        logger_config = logger_config.with_file_output(path);
    }
    if let Err(e) = logger::init_with_config(logger_config) {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::FAILURE;
    }
    if !env_loaded {
        log::debug!("No .env file found, using system environment variables");
    }

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("❌ {}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> studio_ia::Result<()> {
    match command {
        #[cfg(feature = "server")]
        Command::Serve { port } => {
            let config = match port {
                Some(port) => config.with_port(port),
                None => config,
            };
            logger::log_config_info(&config);
            studio_ia::server::run(config).await
        }
        Command::Generate {
            garment,
            brand,
            style,
            ratio,
            out,
            email,
            password,
        } => {
            generate(
                &config,
                GenerateArgs {
                    garment,
                    brand,
                    style,
                    ratio,
                    out,
                    email,
                    password,
                },
            )
            .await
        }
        Command::Styles => {
            for style in PresentationStyle::ALL {
                println!("{:<24} {:?}", style.label(), style);
            }
            println!();
            for ratio in AspectRatio::ALL {
                println!("{:<24} {}", ratio.as_str(), ratio.orientation());
            }
            Ok(())
        }
    }
}

struct GenerateArgs {
    garment: PathBuf,
    brand: String,
    style: Option<String>,
    ratio: String,
    out: PathBuf,
    email: Option<String>,
    password: Option<String>,
}

async fn generate(config: &Config, args: GenerateArgs) -> studio_ia::Result<()> {
    let style = match args.style.as_deref() {
        Some(value) => PresentationStyle::parse(value)
            .ok_or_else(|| StudioError::Validation(format!("Unknown style: {}", value)))?,
        None => PresentationStyle::default(),
    };
    let aspect_ratio = AspectRatio::parse(&args.ratio)?;

    let session = match (&config.identity, args.email, args.password) {
        (Some(identity), Some(email), Some(password)) => {
            let session = Session::new(Arc::new(FirebaseIdentity::new(identity.clone())));
            session.sign_in_with_password(&email, &password).await?;
            Some(session)
        }
        (None, Some(_), _) => {
            return Err(StudioError::Config(
                "FIREBASE_API_KEY is required to sign in".into(),
            ))
        }
        _ => None,
    };

    let token_source = session
        .clone()
        .map(|session| Arc::new(session) as Arc<dyn TokenSource>);
    let client = build_client(config, token_source);
    log::info!("🎨 Using the {} backend", client.name());

    let mut studio = Studio::new(client);
    if let Some(session) = &session {
        studio = studio.with_identity(session.subscribe());
    }

    studio.upload_file(&args.garment).await?;
    studio.set_brand_name(args.brand);
    studio.set_style(style);
    studio.set_aspect_ratio(aspect_ratio);

    studio.generate().await?;
    let path = studio.download(&args.out).await?;
    println!("{}", path.display());
    Ok(())
}
