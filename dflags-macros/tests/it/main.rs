mod choices;
mod help;
mod repeated;

use std::{ffi::OsString, fmt};

use expect_test::{expect, Expect};

use dflags::{ClassSpec, Command, FieldSpec, Member, Schema, TypeExpr};

fn check<F, A>(f: F, args: &str, expect: Expect)
where
    F: FnOnce(Vec<OsString>) -> dflags::Result<A>,
    A: fmt::Debug,
{
    let args = args.split_ascii_whitespace().map(OsString::from).collect::<Vec<_>>();
    let res = f(args);
    match res {
        Ok(args) => {
            expect.assert_debug_eq(&args);
        }
        Err(err) => {
            expect.assert_eq(&err.to_string());
        }
    }
}

#[test]
fn smoke() {
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url https://x --verbose",
        expect![[r#"
            Fetch {
                url: "https://x",
                retries: 3,
                verbose: true,
                quiet: true,
                log_file: None,
            }
        "#]],
    );

    check(
        dflags::parse_from::<smoke::Fetch>,
        "-r 4 --quiet --url https://x --log-file /tmp/log.txt",
        expect![[r#"
            Fetch {
                url: "https://x",
                retries: 4,
                verbose: false,
                quiet: false,
                log_file: Some(
                    "/tmp/log.txt",
                ),
            }
        "#]],
    );

    check(
        dflags::parse_from::<smoke::Fetch>,
        "",
        expect!["Flag is required: `--url`. Use `--help` for more information"],
    );
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url a --url b",
        expect!["Flag specified more than once: `--url`"],
    );
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url a --verbose --verbose",
        expect!["Flag specified more than once: `--verbose`"],
    );
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url a --frobnicate",
        expect!["Unknown flag: `--frobnicate`. Use `--help` for more information"],
    );
    check(dflags::parse_from::<smoke::Fetch>, "--url", expect!["expected a value for `--url`"]);
    check(
        dflags::parse_from::<smoke::Fetch>,
        "-r lol --url a",
        expect!["Can't parse `-r`, invalid digit found in string"],
    );
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url a lol",
        expect!["Unknown command: `lol`. Use `--help` for more information"],
    );
}

#[test]
fn aliases_accept_the_same_values() {
    let long = dflags::parse_from::<smoke::Fetch>(
        vec!["--url".into(), "x".into(), "--retries".into(), "4".into()],
    )
    .unwrap();
    let short = dflags::parse_from::<smoke::Fetch>(
        vec!["--url".into(), "x".into(), "-r".into(), "4".into()],
    )
    .unwrap();
    assert_eq!(format!("{long:?}"), format!("{short:?}"));
}

#[test]
fn flag_values_after_equals_sign() {
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url=https://x --retries=4",
        expect![[r#"
            Fetch {
                url: "https://x",
                retries: 4,
                verbose: false,
                quiet: true,
                log_file: None,
            }
        "#]],
    );
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url a --verbose=yes",
        expect!["Flag `--verbose` does not take a value"],
    );
}

#[test]
fn double_dash_ends_flag_recognition() {
    check(
        dflags::parse_from::<smoke::Fetch>,
        "--url a -- -r",
        expect!["Unknown command: `-r`. Use `--help` for more information"],
    );
    check(
        dflags::parse_from::<positional::Archive>,
        "in out -- -j",
        expect![[r#"
            Archive {
                input: "in",
                output: Some(
                    "out",
                ),
                members: [
                    "-j",
                ],
            }
        "#]],
    );
}

#[test]
fn enums_parse_by_member_name() {
    check(
        dflags::parse_from::<choices::Order>,
        "--food kimchi",
        expect![[r#"
            Order {
                food: Kimchi,
                mode: "fast",
                bits: 64,
            }
        "#]],
    );
    check(
        dflags::parse_from::<choices::Order>,
        "--food gnocchi --mode slow --bits 32",
        expect![[r#"
            Order {
                food: Gnocchi,
                mode: "slow",
                bits: 32,
            }
        "#]],
    );
    check(
        dflags::parse_from::<choices::Order>,
        "--food poutine",
        expect!["Can't parse `--food`, invalid choice: `poutine` (choose from gnocchi, kimchi)"],
    );
}

#[test]
fn literal_choices_check_membership() {
    check(
        dflags::parse_from::<choices::Order>,
        "--food kimchi --mode turbo",
        expect!["Can't parse `--mode`, invalid choice: `turbo` (choose from fast, slow)"],
    );
    check(
        dflags::parse_from::<choices::Order>,
        "--food kimchi --bits 48",
        expect!["Can't parse `--bits`, invalid choice: `48` (choose from 32, 64)"],
    );
}

#[test]
fn repeated_flags_collect_in_input_order() {
    check(
        dflags::parse_from::<repeated::Bench>,
        "",
        expect![[r#"
            Bench {
                filter: [],
                iterations: [
                    10,
                    100,
                ],
            }
        "#]],
    );
    check(
        dflags::parse_from::<repeated::Bench>,
        "--filter a --iterations 5 --filter b",
        expect![[r#"
            Bench {
                filter: [
                    "a",
                    "b",
                ],
                iterations: [
                    5,
                ],
            }
        "#]],
    );
}

#[test]
fn positionals_fill_in_declaration_order() {
    check(
        dflags::parse_from::<positional::Archive>,
        "a",
        expect![[r#"
            Archive {
                input: "a",
                output: None,
                members: [],
            }
        "#]],
    );
    check(
        dflags::parse_from::<positional::Archive>,
        "a b c d",
        expect![[r#"
            Archive {
                input: "a",
                output: Some(
                    "b",
                ),
                members: [
                    "c",
                    "d",
                ],
            }
        "#]],
    );
    check(
        dflags::parse_from::<positional::Archive>,
        "",
        expect!["Flag is required: `input`. Use `--help` for more information"],
    );
}

#[test]
fn subcommands() {
    check(
        dflags::parse_from::<subcommands::Pip>,
        "install pkg1",
        expect![[r#"
            Pip {
                verbose: false,
                action: Install(
                    Install {
                        package: "pkg1",
                        jobs: None,
                    },
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<subcommands::Pip>,
        "--verbose install pkg1 --jobs 4",
        expect![[r#"
            Pip {
                verbose: true,
                action: Install(
                    Install {
                        package: "pkg1",
                        jobs: Some(
                            4,
                        ),
                    },
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<subcommands::Pip>,
        "bogus",
        expect!["Unknown command: `bogus`. Use `--help` for more information"],
    );
    check(
        dflags::parse_from::<subcommands::Pip>,
        "",
        expect!["A sub-command is required. Use `--help` for more information"],
    );
}

#[test]
fn subcommand_names_and_aliases() {
    check(
        dflags::parse_from::<subcommands::Pip>,
        "add pkg1",
        expect![[r#"
            Pip {
                verbose: false,
                action: Install(
                    Install {
                        package: "pkg1",
                        jobs: None,
                    },
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<subcommands::Pip>,
        "info --verbose",
        expect![[r#"
            Pip {
                verbose: false,
                action: Show(
                    Show {
                        verbose: true,
                    },
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<subcommands::Pip>,
        "show --verbose",
        expect!["Unknown command: `show`. Use `--help` for more information"],
    );
}

#[test]
fn flags_resolve_against_the_selected_node() {
    check(
        dflags::parse_from::<subcommands::Pip>,
        "install pkg1 --verbose",
        expect!["Unknown flag: `--verbose`. Use `--help` for more information"],
    );
    check(
        dflags::parse_from::<subcommands::Pip>,
        "--jobs 4 install pkg1",
        expect!["Unknown flag: `--jobs`. Use `--help` for more information"],
    );
}

#[test]
fn optional_union_yields_none_without_a_branch() {
    check(
        dflags::parse_from::<subcommands::Remote>,
        "",
        expect![[r#"
            Remote {
                action: None,
            }
        "#]],
    );
    check(
        dflags::parse_from::<subcommands::Remote>,
        "add https://x",
        expect![[r#"
            Remote {
                action: Some(
                    AddRemote(
                        AddRemote {
                            url: "https://x",
                        },
                    ),
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<subcommands::Remote>,
        "list",
        expect![[r#"
            Remote {
                action: Some(
                    ListRemotes(
                        ListRemotes,
                    ),
                ),
            }
        "#]],
    );
}

#[test]
fn nested_subcommands() {
    check(
        dflags::parse_from::<nested::App>,
        "server launch --log",
        expect![[r#"
            App {
                verbose: false,
                cmd: Server(
                    Server {
                        dir: None,
                        cmd: Launch(
                            Launch {
                                log: true,
                            },
                        ),
                    },
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<nested::App>,
        "--verbose server --dir . watch",
        expect![[r#"
            App {
                verbose: true,
                cmd: Server(
                    Server {
                        dir: Some(
                            ".",
                        ),
                        cmd: Watch(
                            Watch,
                        ),
                    },
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<nested::App>,
        "stats .",
        expect![[r#"
            App {
                verbose: false,
                cmd: Stats(
                    Stats {
                        path: ".",
                    },
                ),
            }
        "#]],
    );
    check(
        dflags::parse_from::<nested::App>,
        "server",
        expect!["A sub-command is required. Use `--help` for more information"],
    );
}

#[test]
fn alias_override_replaces_the_derived_flag() {
    check(
        dflags::parse_from::<builder::Shortcut>,
        "-n 3",
        expect![[r#"
            Shortcut {
                num: 3,
            }
        "#]],
    );
    check(
        dflags::parse_from::<builder::Shortcut>,
        "--num 3",
        expect!["Unknown flag: `--num`. Use `--help` for more information"],
    );
    check(
        dflags::parse_from::<builder::Shortcut>,
        "",
        expect!["Flag is required: `-n`. Use `--help` for more information"],
    );
}

#[test]
fn builder_schemas_parse_like_macro_schemas() {
    check(
        dflags::parse_from::<builder::Creds>,
        "--user me --token s3cret",
        expect![[r#"
            Creds {
                user: "me",
                token: Some(
                    "s3cret",
                ),
            }
        "#]],
    );
}

fn schema_err(spec: ClassSpec) -> String {
    Command::from_spec(&spec).unwrap_err().to_string()
}

fn scalar() -> TypeExpr {
    TypeExpr::scalar::<u32>("u32")
}

#[test]
fn duplicate_destinations_are_rejected() {
    expect![["Args.x: duplicate destination name"]].assert_eq(&schema_err(
        ClassSpec::new("Args")
            .field(FieldSpec::new("x", scalar()))
            .field(FieldSpec::new("x", TypeExpr::Bool)),
    ));

    expect![["Args.other: flag `--x-y` is already registered"]].assert_eq(&schema_err(
        ClassSpec::new("Args")
            .field(FieldSpec::new("x_y", scalar()))
            .field(FieldSpec::new("other", scalar()).alias("--x-y")),
    ));
}

#[test]
fn contradictory_metadata_is_rejected() {
    expect![["Args.x: both `required` and a default are set"]].assert_eq(&schema_err(
        ClassSpec::new("Args")
            .field(FieldSpec::new("x", scalar()).required().default(|| Box::new(0u32))),
    ));

    expect![["Args.x: an Option field cannot be required"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new("x", TypeExpr::option(scalar())).required()),
    ));

    expect![["Args.x: boolean flags cannot be required"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new("x", TypeExpr::Bool).required()),
    ));

    expect![["Args.x: boolean fields cannot be positional"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new("x", TypeExpr::Bool).positional()),
    ));

    expect![["Args.x: positional arguments cannot have aliases"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new("x", scalar()).positional().alias("-x")),
    ));

    expect![["Args.x: alias `x` must begin with `-`"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new("x", scalar()).alias("x")),
    ));

    expect![["Args.help: `--help` collides with the generated help flag"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new("help", TypeExpr::Bool)),
    ));
}

#[test]
fn unsupported_type_nestings_are_rejected() {
    expect![["Args.x: `Option<bool>` has no argument shape"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new("x", TypeExpr::option(TypeExpr::Bool))),
    ));

    expect![["Args.x: `Vec<Option<u32>>` has no argument shape"]].assert_eq(&schema_err(
        ClassSpec::new("Args")
            .field(FieldSpec::new("x", TypeExpr::repeated(TypeExpr::option(scalar())))),
    ));
}

#[test]
fn sub_command_composition_is_validated() {
    expect![["Args: at most one sub-command field per class"]].assert_eq(&schema_err(
        ClassSpec::new("Args")
            .field(FieldSpec::new("a", TypeExpr::union(vec![Member::of::<builder::Creds>()])))
            .field(FieldSpec::new("b", TypeExpr::union(vec![Member::of::<builder::Insecure>()]))),
    ));

    expect![["Args.action: a sub-command field cannot take a default"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(
            FieldSpec::new("action", TypeExpr::union(vec![Member::of::<builder::Creds>()]))
                .default(|| Box::new(0u32)),
        ),
    ));

    expect![["Args: a repeated positional cannot be combined with sub-commands"]].assert_eq(
        &schema_err(
            ClassSpec::new("Args")
                .field(
                    FieldSpec::new(
                        "files",
                        TypeExpr::repeated(TypeExpr::scalar::<String>("String")),
                    )
                    .positional(),
                )
                .field(FieldSpec::new(
                    "action",
                    TypeExpr::union(vec![Member::of::<builder::Creds>()]),
                )),
        ),
    );

    expect![["Args.action: duplicate sub-command name `creds`"]].assert_eq(&schema_err(
        ClassSpec::new("Args").field(FieldSpec::new(
            "action",
            TypeExpr::union(vec![Member::of::<builder::Creds>(), Member::of::<builder::Creds>()]),
        )),
    ));
}

#[test]
fn augmenting_a_parser_merges_arguments() {
    let parser = dflags::make_parser::<builder::Creds>().unwrap();
    let parser = dflags::make_parser_with::<builder::Insecure>(parser).unwrap();
    let mut values =
        parser.run(vec!["--user".into(), "me".into(), "--insecure".into()]).unwrap();
    let creds = builder::Creds::from_values(&mut values).unwrap();
    let extra = builder::Insecure::from_values(&mut values).unwrap();
    assert_eq!(creds.user, "me");
    assert!(creds.token.is_none());
    assert!(extra.insecure);

    let parser = dflags::make_parser::<builder::Creds>().unwrap();
    let err = dflags::make_parser_with::<builder::Creds>(parser).unwrap_err();
    expect![["Creds.user: duplicate destination name"]].assert_eq(&err.to_string());
}

#[test]
fn rebuilding_the_parser_is_idempotent() {
    let one = dflags::make_parser::<subcommands::Pip>().unwrap();
    let two = dflags::make_parser::<subcommands::Pip>().unwrap();
    assert_eq!(format!("{one:?}"), format!("{two:?}"));

    let a = dflags::parse_from::<subcommands::Pip>(vec!["install".into(), "x".into()]).unwrap();
    let b = dflags::parse_from::<subcommands::Pip>(vec!["install".into(), "x".into()]).unwrap();
    assert_eq!(format!("{a:?}"), format!("{b:?}"));
}

#[test]
fn cached_parsers_are_shared() {
    let one = Command::cached::<smoke::Fetch>().unwrap();
    let two = Command::cached::<smoke::Fetch>().unwrap();
    assert!(std::sync::Arc::ptr_eq(&one, &two));
}

#[test]
fn help_renders_the_whole_tree() {
    let parser = dflags::make_parser::<help::RustAnalyzer>().unwrap();
    expect![[r#"
        rust-analyzer
          LSP server for rust.

        ARGS:
            [jobs]
              Number of concurrent jobs.

        OPTIONS:
            --log-file <log-file>
              Path to log file.

            -v, --verbose

            --food {gnocchi,kimchi}

            -h, --help
              Prints help information.

        SUBCOMMANDS:

        rust-analyzer run
          Run the thing.

          OPTIONS:
            -h, --help
              Prints help information.


        rust-analyzer analysis-stats
          Analysis statistics.

          ARGS:
            <path>
              Directory to analyse.

          OPTIONS:
            --parallel

            -h, --help
              Prints help information.
    "#]]
    .assert_eq(&parser.help_text());
}

#[test]
fn help_flag_reports_as_help() {
    let parser = dflags::make_parser::<help::RustAnalyzer>().unwrap();
    let err = dflags::parse_from::<help::RustAnalyzer>(vec!["--help".into()]).unwrap_err();
    assert!(err.is_help());
    assert_eq!(err.to_string(), parser.help_text());

    let err = dflags::parse_from::<help::RustAnalyzer>(vec!["run".into(), "-h".into()])
        .unwrap_err();
    assert!(err.is_help());
    assert_eq!(err.to_string(), parser.help_text());
}

#[test]
fn parser_configuration_renders_back_to_schema_source() {
    let parser = dflags::make_parser::<subcommands::Pip>().unwrap();
    expect![[r#"
        dflags! {
            /// Pip install packages!
            #[prog = "pip"]
            struct Pip {
                /// Be verbose.
                verbose: bool,
                action: Install | Info,
            }

            /// Install a package.
            #[alias = "add"]
            struct Install {
                /// Package to install.
                #[positional]
                package: String,
                /// Parallel jobs.
                jobs: Option<u32>,
            }

            /// Show package info.
            struct Info {
                verbose: bool,
            }
        }
    "#]]
    .assert_eq(&dflags::to_schema_source(&parser));
}
