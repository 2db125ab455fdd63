//! Print-after-parse must reproduce the input token for token, and printing
//! twice must be stable.

use cir_syntax::lexer::tokenize;
use cir_syntax::{ParseOptions, parse, print_module};

const PRELUDE: &str = "cir.func private @callee(!s32i) -> !s32i
cir.global external @gv = #cir.int<0> : !s32i
";

const HOST_ARGS: &str = "%a : !s32i, %b : !s32i, %c : !cir.bool, %p : !cir.ptr<!s32i>, \
%fp : !cir.ptr<!cir.func<(!s32i) -> !s32i>>, %e : !cir.ptr<!void>";

fn token_texts(source: &str) -> Vec<String> {
    tokenize(source)
        .tokens
        .iter()
        .map(|t| t.text.to_owned())
        .collect()
}

fn assert_round_trip(source: &str) {
    let options = ParseOptions::default().with_deprecation_warnings(false);
    let first = parse(source, options.clone());
    assert!(
        first.diagnostics.is_empty(),
        "{source}\n{:#?}",
        first.diagnostics
    );
    let printed = print_module(&first.module);
    assert_eq!(token_texts(source), token_texts(&printed), "{printed}");

    let second = parse(&printed, options);
    assert!(second.diagnostics.is_empty(), "{:#?}", second.diagnostics);
    assert_eq!(first.module.forms(), second.module.forms());
    assert_eq!(printed, print_module(&second.module));
}

/// Wrap operations in a function whose arguments supply every operand the
/// snippets use.
fn in_host(body: &str) -> String {
    format!("{PRELUDE}cir.func @host({HOST_ARGS}) {{\n{body}\n  cir.return\n}}\n")
}

#[test]
fn test_declarations() {
    assert_round_trip(PRELUDE);
    assert_round_trip(
        "cir.func no_inline dso_local internal @k(%x : !s32i {cir.zeroext}, ...) -> !s32i cc(c) global_ctor(65535) attributes {nothrow} {\n  cir.return %x : !s32i\n}",
    );
    assert_round_trip("cir.func @d(!s32i, !cir.ptr<!s8i>) global_dtor special_member<#cir.cxx_ctor<!s32i, default>>");
    assert_round_trip("cir.func @target()\ncir.func @a() alias(@target)");
    assert_round_trip(
        "cir.global \"private\" internal constant comdat tls_dyn @g1 = #cir.int<1> : !s32i",
    );
    assert_round_trip("cir.global external target_address_space(1) @g2 : !s32i");
    assert_round_trip("cir.global external lang_address_space(offload_global) @g3 = #zero : !s32i");
    assert_round_trip(
        "cir.global external @g4 = ctor : !s32i {\n  cir.yield\n} dtor {\n  cir.yield\n}",
    );
    assert_round_trip("cir.global external @g5 = dtor : !s32i {\n  cir.yield\n}");
}

#[test]
fn test_module_wrapper() {
    assert_round_trip(
        "module @m attributes {cir.lang = #cir.lang<c>} {\n  cir.func @f() {\n    cir.return\n  }\n}",
    );
    assert_round_trip("module {\n}");
}

#[test]
fn test_calls() {
    assert_round_trip(&in_host("  %0 = cir.call @callee(%a) : (!s32i) -> !s32i"));
    assert_round_trip(&in_host(
        "  %0 = cir.call %fp(%a) : (!s32i) -> !s32i cc(c) side_effect(pure)",
    ));
    assert_round_trip(&in_host(
        "  %0 = cir.try_call exception(%e) @callee(%a) : (!s32i) -> !s32i",
    ));
    assert_round_trip(&format!(
        "{PRELUDE}cir.func @host(%a : !s32i) -> !s32i {{\n  %0 = cir.try_call @callee(%a) ^ok, ^bad : (!s32i) -> !s32i\n^ok:\n  cir.return %0 : !s32i\n^bad:\n  cir.resume\n}}"
    ));
}

#[test]
fn test_memory() {
    assert_round_trip(&in_host(
        "  %0 = cir.alloca !s32i, !cir.ptr<!s32i>, [\"x\", init] {alignment = 4 : i64}",
    ));
    assert_round_trip(&in_host(
        "  %0 = cir.alloca !s32i, !cir.ptr<!s32i>, %a : !s32i, [\"arr\"] : !cir.ptr<!s32i>",
    ));
    assert_round_trip(&in_host("  %0 = cir.load %p : !cir.ptr<!s32i>, !s32i"));
    assert_round_trip(&in_host(
        "  %0 = cir.load volatile align(4) atomic(seq_cst) %p : !cir.ptr<!s32i>",
    ));
    assert_round_trip(&in_host("  cir.store %a, %p : !s32i, !cir.ptr<!s32i>"));
    assert_round_trip(&in_host("  cir.store volatile %a, %p #tbaa : !s32i"));
    assert_round_trip(&in_host("  %0 = cir.struct_element_addr %p, 1 : !cir.ptr<!s32i>"));
    assert_round_trip(&in_host(
        "  %0 = cir.get_member %p[1] {name = \"x\"} : !cir.ptr<!s32i>",
    ));
    assert_round_trip(&in_host("  %0 = cir.get_global @gv : !cir.ptr<!s32i>"));
    assert_round_trip(&in_host("  %0 = cir.get_global thread_local @gv : !cir.ptr<!s32i>"));
    assert_round_trip(&in_host("  cir.copy %p to %p : !cir.ptr<!s32i>"));
    assert_round_trip(&in_host("  cir.copy %p, %p : !cir.ptr<!s32i>"));
    assert_round_trip(&in_host("  cir.copy %p, %p"));
}

#[test]
fn test_constants_and_casts() {
    assert_round_trip(&in_host("  %0 = cir.const(#cir.int<1> : !s32i) : !s32i"));
    assert_round_trip(&in_host("  %0 = cir.const #cir.int<1> : !s32i"));
    assert_round_trip(&in_host("  %0 = cir.const #true : !cir.bool"));
    assert_round_trip(&in_host("  %0 = cir.cast(integral, %a : !s32i), !s64i"));
    assert_round_trip(&in_host("  %0 = cir.cast integral %a : !s32i -> !s64i"));
    assert_round_trip(&in_host("  %0 = cir.cast integral %a"));
    assert_round_trip(&in_host(
        "  %0 = cir.ptr_stride(%p : !cir.ptr<!s32i>, %a : !s32i), !cir.ptr<!s32i>",
    ));
    assert_round_trip(&in_host(
        "  %0 = cir.ptr_stride %p, %a : (!cir.ptr<!s32i>, !s32i) -> !cir.ptr<!s32i>",
    ));
    assert_round_trip(&in_host("  %0 = cir.ptr_stride %p, %a"));
}

#[test]
fn test_arithmetic() {
    assert_round_trip(&in_host("  %0 = cir.binop(add, %a, %b) #nsw : !s32i"));
    assert_round_trip(&in_host("  %0 = cir.cmp(lt, %a, %b) : !s32i, !cir.bool"));
    assert_round_trip(&in_host("  %0 = cir.unary(minus, %a) : !s32i, !s32i"));
    assert_round_trip(&in_host("  %0 = cir.select %c, %a, %b : !s32i"));
    assert_round_trip(&in_host("  %0 = cir.shift(left, %a : !s32i, %b : !s32i) -> !s32i"));
    assert_round_trip(&in_host("  %0 = cir.shift right %a, %b : (!s32i, !s32i) -> !s32i"));
    assert_round_trip(&in_host("  %0 = cir.objsize max %p : !cir.ptr<!s32i> -> !u64i"));
    assert_round_trip(&in_host("  %0 = cir.objsize(min, %p : !cir.ptr<!s32i>) -> !u64i"));
    for op in ["clrsb", "ffs", "parity"] {
        assert_round_trip(&in_host(&format!("  %0 = cir.{op} %a : !s32i")));
    }
    for op in ["clz", "ctz", "popcount"] {
        assert_round_trip(&in_host(&format!("  %0 = cir.{op} %a zero_poison : !s32i")));
    }
    assert_round_trip(&in_host(
        "  %0 = cir.dyn_cast ptr relative_layout %p : !cir.ptr<!s32i> -> !cir.ptr<!s32i> #dyn_info",
    ));
    assert_round_trip(&in_host(
        "  %0 = cir.dyn_cast(ref, %p : !cir.ptr<!s32i>, #cir.dyn_cast_info<@gv>) -> !cir.ptr<!s32i>",
    ));
    assert_round_trip(&in_host("  %0 = cir.libc.fabs %a : !s32i"));
}

#[test]
fn test_libc_and_runtime() {
    assert_round_trip(&in_host(
        "  cir.libc.memcpy %a bytes from %p to %p : (!s32i, !cir.ptr<!s32i>, !cir.ptr<!s32i>) -> ()",
    ));
    assert_round_trip(&in_host("  %0 = cir.libc.memchr(%p, %a, %b)"));
    assert_round_trip(&in_host(
        "  %0 = cir.libc.memchr %p, %a, %b : (!cir.ptr<!s32i>, !s32i, !s32i) -> !cir.ptr<!s32i>",
    ));
    assert_round_trip(&in_host(
        "  %0 = cir.stack_save : !cir.ptr<!u8i>\n  cir.stack_restore %0 : !cir.ptr<!u8i>",
    ));
    assert_round_trip(&in_host(
        "  %0 = cir.get_runtime_member %p[%b : !s32i] : (!cir.ptr<!s32i>, !s32i) -> !cir.ptr<!s32i>",
    ));
}

#[test]
fn test_structured_control_flow() {
    assert_round_trip(&in_host(
        "  cir.if %c {\n    cir.yield\n  } else {\n    cir.yield\n  }",
    ));
    assert_round_trip(&in_host("  cir.if %c {\n  }"));
    assert_round_trip(&in_host(
        "  %0 = cir.scope {\n    cir.yield %a : !s32i\n  } : !s32i",
    ));
    assert_round_trip(&in_host(
        "  cir.scope {\n    cir.yield\n  } cleanup {\n    cir.yield\n  }",
    ));
    assert_round_trip(&in_host(
        "  cir.switch (%a : !s32i) {\n    cir.case (equal, [#cir.int<1> : !s32i, #cir.int<2> : !s32i]) {\n      cir.break\n    }\n    cir.case (default, []) {\n      cir.yield\n    }\n    cir.yield\n  }",
    ));
    assert_round_trip(&in_host(
        "  %0 = cir.ternary(%c, true {\n    cir.yield %a : !s32i\n  }, false {\n    cir.yield %b : !s32i\n  }) : (!cir.bool) -> !s32i",
    ));
    assert_round_trip(&in_host(
        "  cir.await(init, ready : {\n    cir.condition(%c)\n  }, suspend : {\n    cir.yield\n  }, resume : {\n    cir.yield\n  },)",
    ));
}

#[test]
fn test_loops() {
    assert_round_trip(&in_host(
        "  cir.for : cond {\n    cir.condition(%c)\n  } body {\n    cir.continue\n  } step {\n    cir.yield\n  }",
    ));
    assert_round_trip(&in_host(
        "  cir.while : cond {\n    cir.condition(%c)\n  } body {\n    cir.yield\n  }",
    ));
    assert_round_trip(&in_host(
        "  cir.while {\n    cir.condition(%c)\n  } do {\n    cir.break\n  }",
    ));
    assert_round_trip(&in_host(
        "  cir.do : body {\n    cir.yield\n  } cond {\n    cir.condition(%c)\n  }",
    ));
    assert_round_trip(&in_host(
        "  cir.do {\n    cir.yield\n  } while {\n    cir.condition(%c)\n  }",
    ));
    assert_round_trip(&in_host(
        "  cir.loop while(cond : {\n    cir.condition(%c)\n  }, body : {\n    cir.yield\n  }, step : {\n    cir.yield\n  })",
    ));
    assert_round_trip(&in_host("  cir.loop dowhile(body : {\n    cir.break\n  })"));
}

#[test]
fn test_branches_and_terminators() {
    assert_round_trip(
        "cir.func @f(%a : !s32i, %c : !cir.bool) {\n  cir.brcond %c ^t(%a : !s32i), ^f\n^t(%x : !s32i):\n  cir.br ^f\n^f:\n  cir.return\n}",
    );
    assert_round_trip("cir.func @f() {\n  cir.unreachable\n}");
    assert_round_trip("cir.func @f() {\n  cir.trap\n}");
    assert_round_trip("cir.func @f(%a : !s32i) -> !s32i {\n  cir.return %a : !s32i\n}");
    assert_round_trip(
        "cir.func @f() {\n  cir.label \"here\"\n  %0 = cir.blockaddress <@f, \"here\"> -> !cir.ptr<!void>\n  cir.indirectbr %0 : <!cir.ptr<!void>>, [^a, ^b]\n^a:\n  cir.return\n^b:\n  cir.return\n}",
    );
}

#[test]
fn test_exceptions() {
    assert_round_trip(&in_host(
        "  cir.try {\n    cir.yield\n  } catch [type #cir.global_view<@gv> {\n    %0 = cir.catch_param -> !cir.ptr<!s32i>\n    cir.yield\n  }, #cir.unwind {\n    cir.resume\n  }]",
    ));
    assert_round_trip(&in_host(
        "  cir.try {\n    cir.yield\n  } cleanup {\n    cir.yield\n  }",
    ));
    assert_round_trip("cir.func @f(%e : !cir.ptr<!s32i>) {\n  cir.throw %e : !cir.ptr<!s32i>\n}");
    assert_round_trip("cir.func @f() {\n  cir.throw\n}");
}
