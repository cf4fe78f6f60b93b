//! Invalidation and concurrency behaviour of `CompilerCache`.

use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

use super::*;
use crate::compilation::builtin::{DirectiveEngine, ManifestBackend, ManifestType};
use crate::compilation::{CompilationPipeline, ImportsKind};
use crate::project::{FileSystemProject, MemoryProject};

struct Fixture {
    project: MemoryProject,
    pipeline: CompilationPipeline,
    cache: CompilerCache,
    compiles: AtomicUsize,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let project = MemoryProject::with_files(files.iter().copied());
        let shared: Arc<dyn RazorProject> = Arc::new(project.clone());
        let pipeline = CompilationPipeline::new(
            shared.clone(),
            Arc::new(DirectiveEngine::new()),
            Arc::new(ManifestBackend::new()),
        );
        Self {
            project,
            pipeline,
            cache: CompilerCache::new(shared),
            compiles: AtomicUsize::new(0),
        }
    }

    fn context(&self, path: &str) -> CacheContext<'_> {
        let unit = self.pipeline.resolve_unit(path, ImportsKind::Views);
        CacheContext::new(unit, move |unit| {
            self.compiles.fetch_add(1, Ordering::SeqCst);
            self.pipeline.compile(unit)
        })
    }

    fn get(&self, path: &str) -> Arc<CompilerCacheResult> {
        self.cache.get_or_add(path, |p| self.context(p))
    }

    fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

fn manifest(name: &str) -> CompiledType {
    CompiledType::new(ManifestType {
        namespace: "Precompiled".into(),
        type_name: name.into(),
        base_type: "RazorPage<dynamic>".into(),
        route: None,
        injects: Vec::new(),
        tag_helpers: Vec::new(),
    })
}

#[test]
fn test_repeated_access_compiles_once() {
    let fx = Fixture::new(&[("/Views/Home/Index.cshtml", "<h1>home</h1>")]);

    let first = fx.get("/Views/Home/Index.cshtml");
    let second = fx.get("/Views/Home/Index.cshtml");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fx.compiles(), 1);
    assert!(first.result().unwrap().is_success());
    assert_eq!(first.expiration_tokens().len(), 4);

    let stats = fx.cache.stats();
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.hits, 1);
}

#[test]
fn test_template_change_recompiles() {
    let fx = Fixture::new(&[("/Views/Index.cshtml", "<p>v1</p>")]);
    let first = fx.get("/Views/Index.cshtml");
    assert!(first.result().unwrap().is_success());

    fx.project.write("/Views/Index.cshtml", "@inject\n<p>v2</p>");
    let second = fx.get("/Views/Index.cshtml");

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(fx.compiles(), 2);
    assert!(!second.is_expired());

    // The new entry reflects the new content
    let failures = second.result().unwrap().failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].source_file_path, "/Views/Index.cshtml");
    assert_eq!(failures[0].source_file_content.as_deref(), Some("@inject\n<p>v2</p>"));

    fx.project.write("/Views/Index.cshtml", "<p>v3</p>");
    assert!(fx.get("/Views/Index.cshtml").result().unwrap().is_success());
    assert_eq!(fx.compiles(), 3);
}

#[test]
fn test_import_change_recompiles() {
    let fx = Fixture::new(&[
        ("/_ViewImports.cshtml", "@using App"),
        ("/Views/Index.cshtml", "<p></p>"),
    ]);
    fx.get("/Views/Index.cshtml");

    fx.project.write("/_ViewImports.cshtml", "@using App.Models");
    fx.get("/Views/Index.cshtml");
    assert_eq!(fx.compiles(), 2);
}

#[test]
fn test_created_import_recompiles() {
    let fx = Fixture::new(&[("/Views/Home/Index.cshtml", "<p></p>")]);
    let first = fx.get("/Views/Home/Index.cshtml");
    assert!(!first.is_expired());

    fx.project.write("/Views/_ViewImports.cshtml", "@using App");
    assert!(first.is_expired());

    fx.get("/Views/Home/Index.cshtml");
    assert_eq!(fx.compiles(), 2);
}

#[test]
fn test_unrelated_change_keeps_entry() {
    let fx = Fixture::new(&[
        ("/Views/a.cshtml", "<p>a</p>"),
        ("/Views/b.cshtml", "<p>b</p>"),
    ]);
    let first = fx.get("/Views/a.cshtml");
    fx.project.write("/Views/b.cshtml", "<p>changed</p>");
    fx.project.write("/Other/_ViewImports.cshtml", "@using X");

    assert!(Arc::ptr_eq(&first, &fx.get("/Views/a.cshtml")));
    assert_eq!(fx.compiles(), 1);
}

#[test]
fn test_not_found_is_cached_until_created() {
    let fx = Fixture::new(&[]);

    let missing = fx.get("/Views/New.cshtml");
    assert!(!missing.is_found());
    assert!(matches!(missing.outcome(), CacheOutcome::NotFound));
    assert_eq!(missing.expiration_tokens().len(), 1);
    assert!(Arc::ptr_eq(&missing, &fx.get("/Views/New.cshtml")));

    fx.project.write("/Views/New.cshtml", "<p>new</p>");
    let created = fx.get("/Views/New.cshtml");
    assert!(created.is_found());
    assert!(created.result().unwrap().is_success());
}

#[test]
fn test_failure_is_cached_until_fixed() {
    let fx = Fixture::new(&[("/Views/Broken.cshtml", "@{")]);

    let broken = fx.get("/Views/Broken.cshtml");
    assert!(!broken.result().unwrap().is_success());
    assert!(Arc::ptr_eq(&broken, &fx.get("/Views/Broken.cshtml")));
    assert_eq!(fx.compiles(), 1);

    fx.project.write("/Views/Broken.cshtml", "@{ }");
    assert!(fx.get("/Views/Broken.cshtml").result().unwrap().is_success());
}

#[test]
fn test_app_root_prefix_shares_entry() {
    let fx = Fixture::new(&[("/Foo/Bar.ext", "<p></p>")]);

    let a = fx.get("~/Foo/Bar.ext");
    let b = fx.get("/Foo/Bar.ext");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.path(), "/Foo/Bar.ext");
    assert_eq!(fx.compiles(), 1);
}

#[test]
fn test_concurrent_cold_callers_compile_once() {
    let fx = Fixture::new(&[("/Views/Index.cshtml", "<p>hot</p>")]);
    let barrier = Barrier::new(8);
    let (fx, barrier) = (&fx, &barrier);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    fx.cache.get_or_add("/Views/Index.cshtml", move |p| {
                        let unit = fx.pipeline.resolve_unit(p, ImportsKind::Views);
                        CacheContext::new(unit, move |unit| {
                            fx.compiles.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            fx.pipeline.compile(unit)
                        })
                    })
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(fx.compiles(), 1);
    assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    assert_eq!(fx.cache.stats().compilations, 1);
}

#[test]
fn test_different_paths_do_not_block() {
    let fx = Fixture::new(&[("/a.cshtml", "<p>a</p>"), ("/b.cshtml", "<p>b</p>")]);
    let fx = &fx;
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();

    thread::scope(|scope| {
        scope.spawn(move || {
            let (started_tx, release_rx) = (&started_tx, &release_rx);
            fx.cache.get_or_add("/a.cshtml", move |p| {
                let unit = fx.pipeline.resolve_unit(p, ImportsKind::Views);
                CacheContext::new(unit, move |unit| {
                    fx.compiles.fetch_add(1, Ordering::SeqCst);
                    started_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                    fx.pipeline.compile(unit)
                })
            });
        });

        started_rx.recv().unwrap();
        scope.spawn(move || {
            let b = fx.get("/b.cshtml");
            done_tx.send(b.is_found()).unwrap();
        });

        let b_found = done_rx.recv_timeout(Duration::from_secs(5));
        release_tx.send(()).unwrap();
        assert_eq!(b_found, Ok(true));
    });

    assert_eq!(fx.compiles(), 2);
}

#[test]
fn test_panicking_compile_releases_claim() {
    let fx = Fixture::new(&[("/Views/Index.cshtml", "<p></p>")]);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        fx.cache.get_or_add("/Views/Index.cshtml", |p| {
            let unit = fx.pipeline.resolve_unit(p, ImportsKind::Views);
            CacheContext::new(unit, |_| panic!("backend crashed"))
        })
    }));
    assert!(outcome.is_err());
    assert!(fx.cache.get("/Views/Index.cshtml").is_none());
    assert!(fx.cache.is_empty());

    let entry = fx.get("/Views/Index.cshtml");
    assert!(entry.result().unwrap().is_success());
}

#[test]
fn test_precompiled_views_never_expire() {
    let project = MemoryProject::new();
    let cache = CompilerCache::with_precompiled(
        Arc::new(project.clone()),
        [("~/Views/Home/Index.cshtml", manifest("Views_Home_Index"))],
    );

    let calls = AtomicUsize::new(0);
    let entry = cache.get_or_add("/Views/Home/Index.cshtml", |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        unreachable!("precompiled entries are never rebuilt")
    });

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(entry.result().unwrap().is_precompiled());
    assert!(entry.expiration_tokens().is_empty());
    assert_eq!(entry.compiled_type().unwrap().type_name(), "Views_Home_Index");

    project.write("/Views/Home/Index.cshtml", "<p>source appeared</p>");
    assert!(!entry.is_expired());
}

#[test]
fn test_dependents_of() {
    let fx = Fixture::new(&[
        ("/Views/_ViewImports.cshtml", "@using App"),
        ("/Views/Home/Index.cshtml", "<p></p>"),
        ("/Views/About.cshtml", "<p></p>"),
        ("/Pages/Index.cshtml", "<p></p>"),
    ]);
    for path in ["/Views/Home/Index.cshtml", "/Views/About.cshtml", "/Pages/Index.cshtml"] {
        fx.get(path);
    }

    assert_eq!(
        fx.cache.dependents_of("/Views/_ViewImports.cshtml"),
        ["/Views/About.cshtml", "/Views/Home/Index.cshtml"]
    );
    assert_eq!(fx.cache.dependents_of("/_ViewImports.cshtml").len(), 3);
    assert_eq!(fx.cache.dependents_of("Pages/Index.cshtml"), ["/Pages/Index.cshtml"]);
    assert!(fx.cache.dependents_of("/Unknown.cshtml").is_empty());
}

#[test]
fn test_escaping_path_is_not_found_and_never_expires() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("app");
    fs::create_dir_all(&root).unwrap();

    let project: Arc<dyn RazorProject> = Arc::new(FileSystemProject::new(&root));
    let pipeline = CompilationPipeline::new(
        project.clone(),
        Arc::new(DirectiveEngine::new()),
        Arc::new(ManifestBackend::new()),
    );
    let cache = CompilerCache::new(project);
    let get = || cache.get_or_add("/../secret.txt", |p| pipeline.cache_context(p, ImportsKind::Views));

    let first = get();
    assert!(!first.is_found());

    fs::write(dir.path().join("secret.txt"), "outside the root").unwrap();
    assert!(!first.is_expired());
    assert!(Arc::ptr_eq(&first, &get()));
}

#[test]
fn test_filesystem_project_invalidation() {
    let dir = tempfile::TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("Views")).unwrap();
    fs::write(dir.path().join("Views/Index.cshtml"), "<p>v1</p>").unwrap();

    let project: Arc<dyn RazorProject> = Arc::new(FileSystemProject::new(dir.path()));
    let pipeline = CompilationPipeline::new(
        project.clone(),
        Arc::new(DirectiveEngine::new()),
        Arc::new(ManifestBackend::new()),
    );
    let cache = CompilerCache::new(project);
    let get = || cache.get_or_add("/Views/Index.cshtml", |p| pipeline.cache_context(p, ImportsKind::Views));

    let first = get();
    assert!(Arc::ptr_eq(&first, &get()));

    fs::write(dir.path().join("Views/_ViewImports.cshtml"), "@using App").unwrap();
    let second = get();
    assert!(!Arc::ptr_eq(&first, &second));

    fs::write(dir.path().join("Views/Index.cshtml"), "@{").unwrap();
    let third = get();
    let failures = third.result().unwrap().failures();
    assert_eq!(failures[0].source_file_path, "/Views/Index.cshtml");
    assert_eq!(failures[0].source_file_content.as_deref(), Some("@{"));
}
