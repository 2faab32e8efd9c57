mod helpers;

mod commands;
mod persistence;

fn main() {
    // tests only; see the modules above
}
