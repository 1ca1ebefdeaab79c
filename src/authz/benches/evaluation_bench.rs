//! Evaluation benchmarks
//!
//! Single-document evaluation with and without conditions, multi-document
//! combination, and the full resolve → evaluate path against the in-memory
//! provider.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;
use warden_authz::{
    Attachment, AuthorizationRequest, Authorizer, ConditionBlock, ConditionOperator, EvaluationContext,
    InMemoryPolicyProvider, PolicyDocument, PolicyEvaluator, PolicyProvider, PolicyRecord, PrincipalContext,
    PrincipalRef, RequestContext, ResourceContext, Scope, Statement,
};

fn create_document(statements: usize) -> PolicyDocument {
    (0..statements).fold(PolicyDocument::new(), |doc, i| {
        let statement = if i % 5 == 4 {
            Statement::deny(format!("svc{}:delete", i), "*")
        } else {
            Statement::allow(format!("svc{}:*", i), format!("res{}/*", i % 10))
        };
        doc.with_statement(statement.with_condition(
            ConditionBlock::new().with(ConditionOperator::StringEquals, "resource.ownerId", "${principal.id}"),
        ))
    })
}

fn context() -> EvaluationContext {
    EvaluationContext::new(PrincipalContext::new("alice").with_role("editor"))
        .with_resource(ResourceContext::new("doc", "d1").with_attribute("ownerId", "alice"))
        .with_request(RequestContext::new().with_ip("10.1.2.3"))
}

fn bench_single_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let ctx = context();

    for count in [1usize, 10, 100] {
        let doc = create_document(count);
        for (name, evaluator) in [("validating", PolicyEvaluator::default()), ("trusted", PolicyEvaluator::trusted())] {
            group.bench_with_input(BenchmarkId::new(name, count), &doc, |b, doc| {
                b.iter(|| {
                    evaluator
                        .evaluate(black_box("svc0:read"), black_box("res0/42"), doc, &ctx)
                        .map(|d| d.allowed())
                })
            });
        }
    }

    group.finish();
}

fn bench_conditions(c: &mut Criterion) {
    let ctx = context();
    let doc = PolicyDocument::new().with_statement(
        Statement::allow("doc:*", "doc/*").with_condition(
            ConditionBlock::new()
                .with(ConditionOperator::IpMatch, "request.ip", "10.0.0.0/8")
                .with(ConditionOperator::ArrayContains, "principal.roles", "editor")
                .with(ConditionOperator::StringLike, "resource.ownerId", "al*"),
        ),
    );
    let evaluator = PolicyEvaluator::trusted();

    c.bench_function("evaluate_conditions", |b| {
        b.iter(|| evaluator.evaluate(black_box("doc:read"), black_box("doc/1"), &doc, &ctx))
    });
}

fn bench_evaluate_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_all");
    let ctx = context();
    let evaluator = PolicyEvaluator::trusted();

    for count in [5usize, 50] {
        let docs: Vec<PolicyDocument> = (0..count).map(|_| create_document(10)).collect();
        group.bench_with_input(BenchmarkId::new("documents", count), &docs, |b, docs| {
            b.iter(|| evaluator.evaluate_all(black_box("svc1:read"), black_box("res1/7"), docs, &ctx))
        });
    }

    group.finish();
}

fn bench_authorize(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let scope = Scope::tenant("bench");

    let authorizer = rt.block_on(async {
        let provider = Arc::new(InMemoryPolicyProvider::new());
        for i in 0..100 {
            let id = format!("policy-{}", i);
            provider
                .add_policy(PolicyRecord::new(id.clone(), scope.clone(), create_document(5)), None)
                .await
                .expect("add policy");
            let principal = if i % 2 == 0 {
                PrincipalRef::role("editor")
            } else {
                PrincipalRef::role(format!("role-{}", i))
            };
            provider
                .attach_policy(Attachment::new(id, scope.clone(), principal))
                .await
                .expect("attach policy");
        }
        Authorizer::new(provider)
    });

    let request = AuthorizationRequest::new(scope, "svc1:read", "res1/7", context());

    c.bench_function("authorize_in_memory", |b| {
        b.iter(|| rt.block_on(authorizer.authorize(black_box(&request))))
    });
}

criterion_group!(
    benches,
    bench_single_document,
    bench_conditions,
    bench_evaluate_all,
    bench_authorize
);
criterion_main!(benches);
