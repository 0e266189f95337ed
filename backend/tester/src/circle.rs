use std::io::{self, BufRead, Write};

use progress::{ProgressSnapshot, progress_from_xp};

pub const DEFAULT_CASES: [i64; 11] = [0, 50, 99, 100, 150, 199, 200, 275, 300, 500, 999];

const RULE: usize = 80;

pub fn render_bar(percentage: f64, width: usize) -> String {
    let filled = ((width as f64 * percentage / 100.0) as usize).min(width);

    format!(
        "[{}{}] {percentage:.1}%",
        "#".repeat(filled),
        "-".repeat(width - filled)
    )
}

pub fn status_line(snapshot: &ProgressSnapshot) -> String {
    if snapshot.is_level_complete() {
        "Status: LEVEL COMPLETE!".to_string()
    } else {
        format!(
            "Status: {} XP until Level {}",
            snapshot.xp_remaining(),
            snapshot.current_level + 1
        )
    }
}

pub fn print_cases(cases: &[i64], width: usize) {
    let cases = if cases.is_empty() {
        &DEFAULT_CASES[..]
    } else {
        cases
    };

    println!("{}", "=".repeat(RULE));
    println!("PROGRESS CIRCLE - XP to Visual Progress");
    println!("{}\n", "=".repeat(RULE));

    for &xp in cases {
        let snapshot = progress_from_xp(xp);

        println!("Total XP: {}", snapshot.current_xp);
        println!("Current Level: {}", snapshot.current_level);
        println!(
            "Level Progress: {} / {} XP",
            snapshot.xp_progress, snapshot.xp_needed
        );
        println!(
            "Progress: {}",
            render_bar(snapshot.progress_percentage, width)
        );
        println!("{}", status_line(&snapshot));
        println!("{}\n", "-".repeat(RULE));
    }
}

pub fn interactive(width: usize) -> io::Result<()> {
    println!("Enter XP values to see progress (or 'q' to quit):");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("\nEnter XP: ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.eq_ignore_ascii_case("q") {
            break;
        }

        match input.parse::<i64>() {
            Ok(xp) => {
                let snapshot = progress_from_xp(xp);

                println!("\nLevel {}", snapshot.current_level);
                println!("   {}", render_bar(snapshot.progress_percentage, width));
                println!("   {} / {} XP", snapshot.xp_progress, snapshot.xp_needed);
            }
            Err(_) => println!("Please enter a valid number or 'q' to quit"),
        }
    }

    println!("\nDone!");

    Ok(())
}
