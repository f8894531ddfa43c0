/**
 * RecoContext
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::env;
use std::error::Error;
use std::process;

use getopts::{Matches, Options};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use recocontext::{io, similarity};
use recocontext::{ColumnSpec, DatasetLoader, LoaderConfig, TimeUnit};

struct Job {
    input: String,
    config: LoaderConfig,
    triplets: Option<String>,
    arff: Option<String>,
    specs_json: Option<String>,
    relation: String,
    similar_to: Option<String>,
    num_similar: usize,
}

fn main() {

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Rating file (required). One `user item [rating [timestamp]]` \
        record per line, fields separated by spaces, tabs or commas.", "PATH");
    opts.optopt("c", "columns", "Comma separated positions of the user, item, rating and \
        timestamp fields (optional, defaults to 0,1,2).", "POSITIONS");
    opts.optopt("b", "binarize", "Ratings above this threshold become 1, all others 0 \
        (optional).", "THRESHOLD");
    opts.optopt("u", "time-unit", "Unit of the timestamp field: ns, us, ms, s, m, h or d \
        (optional, defaults to s).", "UNIT");
    opts.optflag("", "skip-header", "Ignore the first line of the rating file");
    opts.optopt("t", "triplets", "Export the ratings as one-based triplets to this file \
        (optional).", "PATH");
    opts.optopt("a", "arff", "Export the ratings in ARFF bag format to this file \
        (optional).", "PATH");
    opts.optopt("o", "outputfile", "Write the dataset specs as JSON to this file (optional, a \
        textual summary is printed to stdout by default).", "PATH");
    opts.optopt("r", "relation", "Relation name of the ARFF export (optional, defaults to \
        ratings).", "NAME");
    opts.optopt("s", "similar-to", "Print the items most similar to this raw item id \
        (optional).", "ID");
    opts.optopt("n", "num-similar", "Number of similar items to print (optional, defaults \
        to 10).", "NUMBER");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let job = match job_from(&matches) {
        Ok(job) => job,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    if let Err(failure) = run(job) {
        error!("{}", failure);
        process::exit(1);
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
}

fn job_from(matches: &Matches) -> Result<Job, String> {

    let input = matches.opt_str("i")
        .ok_or_else(|| String::from("Please specify an inputfile via --inputfile."))?;

    let mut config = LoaderConfig::default().with_skip_header(matches.opt_present("skip-header"));

    if let Some(columns) = matches.opt_str("c") {
        let positions = columns.split(',')
            .map(|position| position.trim().parse::<usize>())
            .collect::<Result<Vec<usize>, _>>()
            .map_err(|failure| format!("Problem with option 'c': {}", failure))?;
        let columns = ColumnSpec::from_positions(&positions)
            .map_err(|failure| format!("Problem with option 'c': {}", failure))?;
        config = config.with_columns(columns);
    }

    if let Some(threshold) = matches.opt_str("b") {
        let threshold = threshold.parse::<f64>()
            .map_err(|failure| format!("Problem with option 'b': {}", failure))?;
        config = config.with_binarize_threshold(threshold);
    }

    if let Some(unit) = matches.opt_str("u") {
        let unit = TimeUnit::parse(&unit)
            .ok_or_else(|| format!("Problem with option 'u': unknown time unit {}", unit))?;
        config = config.with_time_unit(unit);
    }

    let num_similar = matches.opt_get_default("n", 10)
        .map_err(|failure| format!("Problem with option 'n': {}", failure))?;

    Ok(Job {
        input,
        config,
        triplets: matches.opt_str("t"),
        arff: matches.opt_str("a"),
        specs_json: matches.opt_str("o"),
        relation: matches.opt_str("r").unwrap_or_else(|| String::from("ratings")),
        similar_to: matches.opt_str("s"),
        num_similar,
    })
}

fn run(job: Job) -> Result<(), Box<dyn Error>> {

    let mut loader = DatasetLoader::new(&job.input, job.config);
    loader.read_data()?;

    let specs = loader.specs()?;
    match job.specs_json {
        Some(ref path) => io::write_json(&specs, Some(path.as_str()))?,
        None => print!("{}", specs),
    }

    if let Some(path) = job.triplets {
        let num_written = loader.write_triplets(&path)?;
        info!("Wrote {} triplets to {}", num_written, path);
    }

    if let Some(path) = job.arff {
        loader.write_arff(&job.relation, &path)?;
        info!("Wrote ARFF relation {} to {}", job.relation, path);
    }

    if let Some(raw_id) = job.similar_to {
        let item = loader.items()
            .get(&raw_id)
            .ok_or_else(|| format!("Unknown item {}", raw_id))?;

        let matrix = &loader.data().ok_or("No rating data has been read")?.rate_matrix;

        println!("\nItems most similar to {}:", raw_id);
        for scored_item in similarity::similar_items(matrix, item, job.num_similar)? {
            let name = loader.items().raw_id_of(scored_item.item)?;
            println!("\t{}\t{:.4}", name, scored_item.score);
        }
    }

    Ok(())
}
