use clap::Parser;

/// Counts a preferential (instant-runoff) election in which every ballot ranks all the candidates.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the election: ballot files, candidates and rules.
    /// See the manual of the preferential_tally crate for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the outcome of an election in JSON format. If provided, pvtally will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path or 'stdout') If specified, the summary of the election will be written in JSON format to the given
    /// location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The file with the ballots. Setting this option overrides the ballot sources of the
    /// --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (json, csv or xlsx) The type of the input. By default, it is guessed from the extension of the file.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (id:title, repeated) The candidates of the election, if they are not in the configuration file
    /// or in the ballot file. Example: --candidates 1:Alice --candidates 2:Bob
    #[clap(long, value_parser)]
    pub candidates: Vec<String>,

    /// (ballotsCast or continuingBallots) The number of ballots a winner must hold more than half of.
    #[clap(long, value_parser)]
    pub majority_basis: Option<String>,

    /// (number) If specified, the election must have exactly this number of candidates.
    #[clap(long, value_parser)]
    pub candidate_count: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
