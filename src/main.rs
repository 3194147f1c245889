use anyhow::{ensure, Context as _};
use knn_cv::report::{self, PredictionCurve};
use knn_cv::{CrossValidationOptions, DatasetOptions, Kernel, KnnTuner, ResampleMetric};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use structopt::StructOpt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, StructOpt)]
#[structopt(about = "Choose k for k-nearest-neighbors regression by repeated k-fold cross-validation")]
struct Opt {
    /// CSV file with a header row (reads stdin when omitted)
    #[structopt(long)]
    input: Option<PathBuf>,

    #[structopt(long, default_value = "lstat")]
    feature: String,

    #[structopt(long, default_value = "medv")]
    target: String,

    #[structopt(long, default_value = "1")]
    k_min: NonZeroUsize,

    #[structopt(long, default_value = "50")]
    k_max: NonZeroUsize,

    #[structopt(long, default_value = "10")]
    folds: NonZeroUsize,

    #[structopt(long, default_value = "5")]
    repetitions: NonZeroUsize,

    /// rectangular, triangular, epanechnikov, biweight, triweight, cos, inv or gaussian
    #[structopt(long, default_value = "rectangular")]
    kernel: Kernel,

    /// pooled or fold-average
    #[structopt(long, default_value = "pooled")]
    metric: ResampleMetric,

    #[structopt(long)]
    seed: Option<u64>,

    /// Run cross-validation repetitions in parallel
    #[structopt(long)]
    parallel: bool,

    /// k values to draw illustrative prediction curves for
    #[structopt(long = "curve", default_value = "1,10,50", use_delimiter = true)]
    curves: Vec<NonZeroUsize>,
}

#[derive(Debug, Serialize)]
struct Output {
    selected_k: usize,
    cross_validation: knn_cv::CrossValidationTable,
    fit: PredictionCurve,
    curves: Vec<PredictionCurve>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knn_cv=info".into()),
        )
        .init();

    let opt = Opt::from_args();
    ensure!(opt.k_min <= opt.k_max, "--k-min must not exceed --k-max");

    let loader = DatasetOptions::new().feature(&opt.feature).target(&opt.target);
    let dataset = match &opt.input {
        Some(path) => loader
            .load_path(path)
            .with_context(|| format!("cannot load {}", path.display()))?,
        None => loader
            .load(std::io::stdin().lock())
            .context("cannot load stdin")?,
    };
    let table = dataset.table()?;

    let mut cross_validation = CrossValidationOptions::new()
        .folds(opt.folds)
        .repetitions(opt.repetitions)
        .kernel(opt.kernel)
        .metric(opt.metric)
        .parallel(opt.parallel);
    if let Some(seed) = opt.seed {
        cross_validation = cross_validation.seed(seed);
    }

    let tuned = KnnTuner::new(opt.k_min.get()..=opt.k_max.get())
        .cross_validation(cross_validation)
        .tune(&table)?;

    let ks = opt
        .curves
        .iter()
        .copied()
        .filter(|k| {
            let fits = k.get() <= table.rows_len();
            if !fits {
                tracing::warn!(k = k.get(), rows = table.rows_len(), "skipping curve");
            }
            fits
        })
        .collect::<Vec<_>>();
    let curves = report::illustrate(&table, &ks, opt.kernel)?;

    let selected_k = tuned.best_k();
    let fit = PredictionCurve::new(tuned.regressor(), &table);
    let output = Output {
        selected_k,
        cross_validation: tuned.into_parts().0,
        fit,
        curves,
    };
    serde_json::to_writer_pretty(std::io::stdout().lock(), &output)?;
    println!();

    Ok(())
}
