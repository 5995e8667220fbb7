use anyhow::{bail, Context};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerArgs {
    pub tickers: Vec<String>,
    pub years: Option<usize>,
    pub pretty: bool,
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1))
}

impl RunnerArgs {
    /// Parse `--ticker AAPL`, `--tickers AAPL MSFT ...`, `--years N` and `--pretty`.
    ///
    /// `args` excludes the program name.
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut tickers: Vec<String> = Vec::new();

        if let Some(t) = value_after(args, "--ticker") {
            tickers.push(t.clone());
        }
        if let Some(idx) = args.iter().position(|a| a == "--tickers") {
            tickers.extend(
                args[idx + 1..]
                    .iter()
                    .take_while(|a| !a.starts_with("--"))
                    .flat_map(|a| a.split(','))
                    .filter(|s| !s.trim().is_empty())
                    .map(|s| s.trim().to_string()),
            );
        }

        let tickers: Vec<String> = tickers.into_iter().map(|t| t.to_ascii_uppercase()).collect();
        if tickers.is_empty() {
            bail!("usage: fin-analyze --ticker AAPL | --tickers AAPL MSFT [--years N] [--pretty]");
        }

        let years = match value_after(args, "--years") {
            Some(v) => {
                let n: usize = v.parse().with_context(|| format!("invalid --years value '{}'", v))?;
                if n == 0 {
                    bail!("--years must be positive");
                }
                Some(n)
            }
            None => None,
        };

        Ok(Self {
            tickers,
            years,
            pretty: args.iter().any(|a| a == "--pretty"),
        })
    }
}
