use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;
use std::io::Write;

const BIN_NAME: &str = "detach";

fn generate_into<C: CommandFactory>(shell: Shell, out: &mut dyn Write) {
    clap_complete::generate(shell, &mut C::command(), BIN_NAME, out);
}

#[allow(clippy::unnecessary_wraps)]
pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, String> {
    generate_into::<C>(shell, &mut std::io::stdout().lock());
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    #[command(name = "detach")]
    struct Sample {
        #[arg(long)]
        app: Option<String>,
    }

    #[test]
    fn completions_mention_binary_and_flags() {
        let mut buf = Vec::new();
        generate_into::<Sample>(Shell::Bash, &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains(BIN_NAME));
        assert!(script.contains("--app"));
    }
}
