use community_sim::runner::{run_with_args, summarize};

fn main() {
    match run_with_args(|_, _| Ok(())) {
        Ok(context) => print!("{}", summarize(&context)),
        Err(e) => {
            eprintln!("community-sim: {e}");
            std::process::exit(1);
        }
    }
}
