use smtfe_rs::session::Session;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let s = Session::default();

    let a = s.mk_var("a");
    let b = s.mk_var("b");
    println!("a = {}, b = {}", s.name(a), s.name(b));

    s.eval(a.gt(2));
    s.eval((a + 2 * b).eq(7));
    for c in s.clauses(a) {
        println!("clause on a: {}", s.show(&c));
    }
    println!("clauses on b: {}", s.clauses(b).len());

    let formula = s.collect_all()?;
    println!("formula = {}", formula);

    println!("result = {}", s.check_sat()?);
    println!("values =\n{}", s.render_values(&[])?);

    let myu32 = s.mk_bitvec("myu32", 32);
    s.eval(myu32.eq(10));
    println!("myu32 = {}", s.render_values(&[myu32])?);

    Ok(())
}
