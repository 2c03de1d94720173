#[cfg(not(target_arch = "wasm32"))]
mod native {
    use clap::Parser;
    use labs_showcase::{
        flow::WindowSettings,
        interaction::{PositionMode, SpinRate, TransformOptions},
        page::root,
    };

    #[derive(Parser, Debug)]
    #[command(version, about)]
    struct Args {
        /// Yaw speed of the rotate interaction: `per-frame` or radians per second
        #[arg(long, default_value = "per-frame")]
        spin_rate: SpinRate,

        /// Treat configured model positions as a baseline for the scroll offset
        #[arg(long)]
        baseline_position: bool,

        /// Initial window width in logical pixels
        #[arg(long, default_value_t = 1280)]
        width: u32,

        /// Initial window height in logical pixels
        #[arg(long, default_value_t = 800)]
        height: u32,
    }

    pub fn main() -> anyhow::Result<()> {
        let args = Args::parse();
        let options = TransformOptions {
            position_mode: if args.baseline_position {
                PositionMode::Baseline
            } else {
                PositionMode::ScrollOverride
            },
            spin_rate: args.spin_rate,
        };
        let settings = WindowSettings {
            size: [args.width.max(1), args.height.max(1)],
            ..WindowSettings::default()
        };
        root::run(options, settings)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    native::main()
}

// The browser entry point is `start` in the library.
#[cfg(target_arch = "wasm32")]
fn main() {}
