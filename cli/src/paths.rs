//! Known path listing

use tracewalk_core::TransitionTree;

/// Print every known path, one per line
pub fn run_paths_command(tree: &TransitionTree) {
    let paths = tree.paths();
    for path in &paths {
        println!("{path}");
    }
    println!();
    println!(
        "{} paths over {} distinct events",
        paths.len(),
        tree.vocabulary().len()
    );
}
