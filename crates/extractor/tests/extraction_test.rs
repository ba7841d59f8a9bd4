//! Behaviour tests for the class-name extractor.

#![allow(clippy::unwrap_used)]

use jadep_extractor::referenced_classes_in_source;

const IMPLICIT: &[&str] = &["Class", "Object", "String", "System", "Thread"];

fn extract(source: &str) -> Vec<String> {
    let implicit: Vec<String> = IMPLICIT.iter().map(|s| s.to_string()).collect();
    let mut got = referenced_classes_in_source("Test.java", source, &implicit).unwrap();
    got.sort();
    got
}

fn sorted(want: &[&str]) -> Vec<String> {
    let mut want: Vec<String> = want.iter().map(|s| s.to_string()).collect();
    want.sort();
    want
}

#[test]
fn test_no_duplicates() {
    let source = r#"import foo.Bar;
        import foo.Bar;
        class Dummy {
            void method() {
                new ClassB(ClassA.class);
                new ClassA();
            }
        }"#;
    assert_eq!(extract(source), sorted(&["foo.Bar", "ClassA", "ClassB"]));
}

#[test]
fn test_return_values_are_considered() {
    let source = "class Dummy { ClassA method() { return null; } }";
    assert_eq!(extract(source), sorted(&["ClassA"]));
}

#[test]
fn test_static_calls_cause_classes_to_be_included() {
    let source = r#"class Dummy {
            void method() {
                ImmutableList.of();
                com.google.common.collect.ImmutableMap.of();
                ExternalClassA.ExternalAInnerClass.create();
                com.google.common.ExternalClassB.ExternalBInnerClass.create();
                System.out.println();
                tempDeclaration.get();
                TAG_TYPES_TO_FILTER.run();
            }
        }"#;
    assert_eq!(
        extract(source),
        sorted(&[
            "com.google.common.collect.ImmutableMap",
            "ImmutableList",
            "ExternalClassA",
            "com.google.common.ExternalClassB",
        ])
    );
}

#[test]
fn test_unresolved_classes_are_assumed_in_own_package() {
    let source = "package com.foo;\nclass A extends B {}";
    assert_eq!(extract(source), sorted(&["com.foo.B"]));
}

#[test]
fn test_field_access_causes_classes_to_be_included() {
    let source = r#"class Dummy {
            void method() {
                int i = com.google.common.ExternalClassC.SOME_CONSTANT;
                Object j = ExternalClassD.SOME_CONSTANT;
            }
        }"#;
    assert_eq!(
        extract(source),
        sorted(&["com.google.common.ExternalClassC", "ExternalClassD"])
    );
}

#[test]
fn test_annotations_are_returned() {
    let source = r#"class Dummy {
            @VisibleForTesting
            @Module(injects = Bla.class)
            @DefinedInSameFile
            void method() { }

            @interface DefinedInSameFile { }
        }"#;
    assert_eq!(extract(source), sorted(&["VisibleForTesting", "Module", "Bla"]));
}

#[test]
fn test_inner_classes_and_self_are_ignored() {
    let source = r#"package com.company;
        import com.google.common.InnerClass;
        class Dummy {
            void method() {
                InnerClass.run();
                InnerClass.InnerInnerEnum.run();
                Dummy.staticMethod();
                com.company.Dummy.InnerClass.run();
            }

            public static class InnerClass {
                public enum InnerInnerEnum { }
            }
        }"#;
    assert_eq!(extract(source), sorted(&["com.google.common.InnerClass"]));
}

#[test]
fn test_fully_qualified_names_are_reported() {
    let source = r#"package com.company;
        class Dummy {
            void method() {
                com.google.Foo.InnerClass.run();
            }
        }"#;
    assert_eq!(extract(source), sorted(&["com.google.Foo"]));
}

#[test]
fn test_inner_classes_called_from_lambda_are_ignored() {
    let source = r#"class Foo {
            static class UnsupportedException { }
            void foo() {
                Consumer<?> a = o -> new UnsupportedException();
            }
        }"#;
    assert_eq!(extract(source), sorted(&["Consumer"]));
}

#[test]
fn test_inner_classes_in_synchronized_are_ignored() {
    let source = r#"class Dummy {
            private void f(OtherClass otherClass) {
                synchronized (otherClass) {
                    Class c = InnerClass.class;
                }
            }
            public static class InnerClass { }
        }"#;
    assert_eq!(extract(source), sorted(&["OtherClass"]));
}

#[test]
fn test_static_imports() {
    let source = r#"import static com.google.common.base.Preconditions.checkNotNull;
        import static com.foo.Bar.CONSTANT;
        import java.util.*;
        import static com.google.common.collect.Iterables.*;
        class A {
            A() {
                Object a = CONSTANT;
                checkNotNull();
            }
        }"#;
    assert_eq!(
        extract(source),
        sorted(&[
            "com.google.common.base.Preconditions",
            "com.foo.Bar",
            "com.google.common.collect.Iterables",
        ])
    );
}

#[test]
fn test_declared_type_parameters_are_in_scope() {
    let source = r#"class Foo<T> implements java.util.List<T> {
            class Bar<T> {
                void bla(T t) {}
            }
            void bla(T t) {}
            <U> void genericBla(U u) { }
        }"#;
    assert_eq!(extract(source), sorted(&["java.util.List"]));
}

#[test]
fn test_type_parameters_of_other_methods_are_not_in_scope() {
    let source = r#"class Foo {
            <U> void genericBla(U u) { }
            abstract U concreteBla();
        }"#;
    assert_eq!(extract(source), sorted(&["U"]));
}

#[test]
fn test_throws_clause_is_processed() {
    let source = r#"class A {
            void foo() throws IOException, java.io.FileNotFoundException {}
        }"#;
    assert_eq!(
        extract(source),
        sorted(&["IOException", "java.io.FileNotFoundException"])
    );
}

#[test]
fn test_all_caps_fields_are_not_class_names() {
    let source = r#"class A {
            FormattingLogger LOG = null;
            void foo() {
                LOG.warning();
            }
        }"#;
    assert_eq!(extract(source), sorted(&["FormattingLogger"]));
}

#[test]
fn test_implicit_import_inner_classes_are_not_reported() {
    let source = "class A extends Thread.UncaughtExceptionHandler { }";
    assert_eq!(extract(source), sorted(&[]));
}

#[test]
fn test_qualified_implicit_imports_are_reported() {
    let source = "import static java.lang.String.format;\nimport java.lang.reflect.Method;";
    assert_eq!(
        extract(source),
        sorted(&["java.lang.String", "java.lang.reflect.Method"])
    );
}

#[test]
fn test_lambdas() {
    let source = r#"class A {
            void m() {
                Function o = (x) -> x;
            }
        }"#;
    assert_eq!(extract(source), sorted(&["Function"]));
}

#[test]
fn test_unconventional_names() {
    // new org.g_Foo() must be a class because of the grammar, so it is
    // reported verbatim. org.g_Bar.f() is ambiguous, so it is dropped.
    let source = r#"package org;
        class A {
            void f() {
                new org.g_Foo();
                org.g_Bar.f();
            }
        }"#;
    assert_eq!(extract(source), sorted(&["org.g_Foo"]));
}

#[test]
fn test_unconventional_imports_are_reported_whole() {
    let source = "import foo.bar;\nimport foo.camelCase.Bar;";
    assert_eq!(extract(source), sorted(&["foo.bar", "foo.camelCase.Bar"]));
}

#[test]
fn test_on_demand_imports() {
    // Non-static on-demand imports name packages and are dropped; static
    // on-demand imports name classes and are reported.
    let source = r#"import foo.bar.*;
        import static foo.bla.*;
        import foo.baz.Baz.*;
        import static foo.camelCase.Bar.*;"#;
    assert_eq!(
        extract(source),
        sorted(&["foo.bla", "foo.baz.Baz", "foo.camelCase.Bar"])
    );
}

#[test]
fn test_type_parameter_bounds() {
    let source = r#"class A {
            <B extends BaseModel<B>> B m1() { return null; }
            <B extends BaseModel<C>> B m2() { return null; }
        }"#;
    assert_eq!(extract(source), sorted(&["BaseModel", "C"]));
}

#[test]
fn test_package_names_with_digits() {
    let source = "import com.google.ads.proto.proto2api.Ads.LocalUniversalAdParams;";
    assert_eq!(extract(source), sorted(&["com.google.ads.proto.proto2api.Ads"]));
}

#[test]
fn test_implicit_imports_are_suppressed() {
    let source = r#"class A {
            void f() {
                String s;
                Object o;
                System.out.println();
                Map m;
            }
        }"#;
    let implicit: Vec<String> = ["Object", "String", "System"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let got = referenced_classes_in_source("Test.java", source, &implicit).unwrap();
    assert_eq!(got, vec!["Map"]);
}

#[test]
fn test_syntax_error_is_reported() {
    let source = "class A {\n  void f() {\n}";
    assert!(referenced_classes_in_source("Test.java", source, &[]).is_err());
}

#[tokio::test]
async fn test_referenced_classes_merges_files_and_skips_broken_ones() {
    let tmp = tempfile::tempdir().unwrap();
    let a = tmp.path().join("A.java");
    let b = tmp.path().join("B.java");
    let broken = tmp.path().join("Broken.java");
    std::fs::write(&a, "class A { Shared s; OnlyInA x; }").unwrap();
    std::fs::write(&b, "class B { Shared s; OnlyInB y; }").unwrap();
    std::fs::write(&broken, "class {").unwrap();

    let mut got: Vec<String> = jadep_extractor::referenced_classes(&[a, b, broken], &[])
        .await
        .iter()
        .map(|c| c.to_string())
        .collect();
    got.sort();
    assert_eq!(got, vec!["OnlyInA", "OnlyInB", "Shared"]);
}

// Scenario E1: a qualified new expression in a one-class file.
#[test]
fn test_qualified_new_in_package() {
    let source = "package com; class A { void f() { new com.google.Foo.Inner(); } }";
    assert_eq!(extract(source), sorted(&["com.google.Foo"]));
}

#[test]
fn test_locality_own_classes_never_reported() {
    let source = r#"package com.foo;
        class A {
            void f() {
                A a = new A();
                B b = new B();
                com.foo.A c = null;
            }
        }
        class B { }"#;
    let got = extract(source);
    assert!(
        !got.iter().any(|c| c == "com.foo.A" || c == "com.foo.B" || c == "A" || c == "B"),
        "own classes leaked: {got:?}"
    );
}
