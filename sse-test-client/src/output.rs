use colored::*;

/// Outcome of one scenario: every check is printed as it runs and recorded
/// here for the final summary.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub details: Vec<String>,
}

impl TestResult {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            details: Vec::new(),
        }
    }

    pub fn check(&mut self, description: &str, ok: bool) {
        if ok {
            println!("  {} {}", "✓".green(), description);
        } else {
            println!("  {} {}", "✗".red(), description);
            self.passed = false;
        }
        self.details
            .push(format!("{} {}", if ok { "✓" } else { "✗" }, description));
    }
}

pub fn print_test_summary(results: &[TestResult]) {
    for result in results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        println!("{} {}", status, result.name);
    }

    let passed = results.iter().filter(|r| r.passed).count();
    println!("\n{} of {} scenarios passed", passed, results.len());
}
