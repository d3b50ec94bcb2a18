use tokio_util::sync::CancellationToken;

mod buffer;
mod cli;
mod color;
mod config;
mod control;
mod error;
mod frame_task;
mod geometry;
mod layout;
mod logging;
mod mqtt;
mod output;
mod scheduler;
mod settings;
mod source;
mod weather;

use crate::config::Backend;
use crate::config::Config;
use crate::error::ConfigurationError;
use crate::error::Error;
use crate::layout::WordLayout;
use crate::output::Display;
use crate::output::DisplaySettings;
use crate::output::Output;
use crate::settings::SettingsError;
use crate::settings::SettingsStore;
use crate::source::clock::ClockSettings;
use crate::source::clock::ClockSource;
use crate::source::temperature::FetchPolicy;
use crate::source::temperature::TemperatureSettings;
use crate::source::temperature::TemperatureSource;
use crate::weather::OpenWeatherMap;

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::eyre::Result<()> {
    setup_panic();
    color_eyre::install().map_err(Error::InstallingColorEyre)?;

    // has to be resolved while this is the only thread of the process
    let utc_offset = time::UtcOffset::current_local_offset().map_err(Error::TimeOffset)?;

    let cli = <crate::cli::Cli as clap::Parser>::parse();
    crate::logging::setup(cli.verbosity).map_err(Error::Logging)?;
    let cfg = Config::load(&cli.config).await?;

    match cli.command {
        cli::Command::Run => {
            run(cfg, utc_offset).await?;
        }
        cli::Command::VerifyConfig => {
            let settings = load_settings(&cfg).await?;
            let components = Components::build(&cfg, &settings).await?;
            tracing::info!(
                grid = ?components.layout.grid(),
                temperature = components.temperature.is_some(),
                "Configuration verified"
            );
        }
    }

    Ok(())
}

fn setup_panic() {
    human_panic::setup_panic!(human_panic::Metadata::new(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
}

async fn load_settings(config: &Config) -> Result<SettingsStore, SettingsError> {
    match config.display.settings.as_deref() {
        Some(path) => SettingsStore::load(path).await,
        None => Ok(SettingsStore::in_memory()),
    }
}

/// Everything built from configuration and persisted settings before the first frame.
struct Components {
    layout: WordLayout,
    clock: ClockSource,
    temperature: Option<TemperatureSource<OpenWeatherMap>>,
    display: DisplaySettings,
}

impl Components {
    async fn build(config: &Config, settings: &SettingsStore) -> Result<Self, Error> {
        let grid = config.grid();
        let layout = match config.display.layout.as_deref() {
            Some(path) => WordLayout::load(grid, path).await?,
            None => WordLayout::parse(grid, crate::layout::FRENCH)?,
        };

        let clock_settings =
            ClockSettings::from_section(&settings.section("clock")).map_err(SettingsError::from)?;
        let clock = ClockSource::new(&layout, clock_settings)?;

        let temperature = if config.temperature.enable {
            let weather = config
                .weather
                .as_ref()
                .ok_or(ConfigurationError::MissingWeather)?;

            let provider = OpenWeatherMap::new(&weather.base_url, weather.api_key.clone(), weather.timeout)
                .map_err(Error::Weather)?;
            let policy = FetchPolicy {
                timeout: weather.timeout,
                refresh_interval: weather.refresh_interval,
            };
            let temperature_settings = TemperatureSettings::from_section(&settings.section("temperature"))
                .map_err(SettingsError::from)?;

            Some(TemperatureSource::new(grid, provider, policy, temperature_settings)?)
        } else {
            None
        };

        let display =
            DisplaySettings::from_section(&settings.section("display")).map_err(SettingsError::from)?;

        Ok(Self {
            layout,
            clock,
            temperature,
            display,
        })
    }
}

async fn run(config: Config, utc_offset: time::UtcOffset) -> Result<(), Error> {
    let settings = load_settings(&config).await?;
    let components = Components::build(&config, &settings).await?;
    let grid = config.grid();

    match config.display.backend {
        Backend::Ddp {
            host,
            port,
            udp_port,
        } => {
            let writer = crate::output::ddp::DdpWriter::connect(host, port, udp_port)?;
            let display = Display::new(writer, grid, components.display.clone());
            render(config, components, display, settings, utc_offset).await
        }

        Backend::Terminal { fill_empty } => {
            let writer =
                crate::output::terminal::TerminalWriter::stdout(grid, components.layout.letters(), fill_empty);
            let display = Display::new(writer, grid, components.display.clone());
            render(config, components, display, settings, utc_offset).await
        }
    }
}

async fn render<O>(
    config: Config,
    components: Components,
    output: O,
    settings: SettingsStore,
    utc_offset: time::UtcOffset,
) -> Result<(), Error>
where
    O: Output,
{
    let cancellation_token = CancellationToken::new();
    let scheduler = crate::scheduler::Scheduler::new(config.schedule(), tokio::time::Instant::now());

    let (control_sender, control_receiver) = tokio::sync::mpsc::channel(100);
    let control_receiver = config.mqtt.is_some().then_some(control_receiver);

    let temperature = components
        .temperature
        .map(|temperature| Box::new(temperature) as Box<dyn crate::source::Source>);

    let frame_task = crate::frame_task::FrameTask::new(
        output,
        Box::new(components.clock),
        temperature,
        scheduler,
        settings,
        utc_offset,
        control_receiver,
        cancellation_token.clone(),
    );

    let mqtt_task = config.mqtt.map(|mqtt_config| {
        tokio::task::spawn(crate::mqtt::run(
            mqtt_config,
            frame_task.subscriptions(),
            cancellation_token.clone(),
            control_sender,
        ))
    });

    let result = frame_task.run().await;
    cancellation_token.cancel();

    if let Some(mqtt_task) = mqtt_task {
        match mqtt_task.await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::error!(?error, "MQTT processing failed"),
            Err(error) => tracing::error!(?error, "MQTT task panicked"),
        }
    }

    result
}
