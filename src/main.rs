use mudlisp::repl;

fn main() {
    println!("Hello! This is the mudlisp object scripting language!");
    println!("Feel free to type in expressions");
    repl::start();
}
