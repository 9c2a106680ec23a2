use std::fs;
use std::path::Path;

use jotter::build::{build_site, Mode};
use jotter::config::{Project, PROJECT_FILE};
use jotter::site::FailureKind;
use jotter::source;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn write(root: &Path, name: &str, contents: &str) -> Result<()> {
    let path = root.join(name);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn fixture(root: &Path) -> Result<()> {
    write(root, PROJECT_FILE, "title: Notes\nindex_layout: index\n")?;
    write(root, "_layouts/base.html", "<html>{{.content}}</html>")?;
    write(root, "_layouts/post.html", "---\nlayout: base\n---\n<h1>{{.title}}</h1>{{.content}}")?;
    write(root, "_layouts/page.html", "---\nlayout: base\n---\n{{.content}}")?;
    write(root, "_layouts/tag.html", "{{.tag.name}}{{range .documents}} {{.url}}{{end}}")?;
    write(root, "_layouts/index.html", "{{range .documents}}{{.title}};{{end}}")?;
    write(
        root,
        "_posts/2022-01-01-x.md",
        "---\nlayout: post\ntitle: X\ntags: [java]\n---\nHello <!-- more --> world",
    )?;
    write(root, "about.md", "---\nlayout: page\n---\nAbout [x](_posts/2022-01-01-x.md)")?;
    write(root, "README.md", "not part of the site")?;
    write(root, "_drafts/2022-02-02-y.md", "---\nlayout: post\ntitle: Y\n---\n")?;
    write(root, ".hidden/z.md", "---\nlayout: page\n---\n")?;
    write(root, "static/css/site.css", "body {}")?;
    Ok(())
}

#[test]
fn test_discover_skips_hidden_and_excluded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path())?;
    let sources = source::discover(
        dir.path(),
        &[dir.path().join("static")],
        &["README.md".to_owned()],
    )?;
    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(vec!["_posts/2022-01-01-x.md", "about.md"], names);
    Ok(())
}

#[test]
fn test_discover_skips_output_given_in_another_form() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path())?;
    write(dir.path(), "public/stale.md", "---\nlayout: page\n---\n")?;

    // the root is reached through `..` while the output directory is not
    let root = dir.path().join("_posts").join("..");
    let sources = source::discover(&root, &[dir.path().join("public")], &[])?;
    let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(vec!["README.md", "_posts/2022-01-01-x.md", "about.md"], names);
    Ok(())
}

#[test]
fn test_build_writes_site() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path())?;
    let project = Project::find(&dir.path().join("_posts"))?;

    // stale output is cleared
    write(dir.path(), "_site/stale.html", "old")?;
    let build = build_site(&project, Mode::Write)?;
    assert!(build.report.is_success(), "{}", build.report);

    let out = dir.path().join("_site");
    assert_eq!(
        "<html><h1>X</h1><p>Hello <!-- more --> world</p>\n</html>",
        fs::read_to_string(out.join("2022/01/01/x/index.html"))?
    );
    assert!(fs::read_to_string(out.join("about/index.html"))?
        .contains(r#"<a href="/2022/01/01/x/">x</a>"#));
    assert_eq!(
        "java /2022/01/01/x/",
        fs::read_to_string(out.join("tags/java/index.html"))?
    );
    assert_eq!("X;", fs::read_to_string(out.join("index.html"))?);
    assert_eq!("body {}", fs::read_to_string(out.join("css/site.css"))?);
    assert!(!out.join("stale.html").exists());
    assert!(!out.join("README/index.html").exists());
    Ok(())
}

#[test]
fn test_build_is_idempotent() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path())?;
    let project = Project::find(dir.path())?;

    let first = build_site(&project, Mode::Write)?;
    let page = fs::read_to_string(dir.path().join("_site/2022/01/01/x/index.html"))?;
    let second = build_site(&project, Mode::Write)?;
    assert_eq!(first.outputs, second.outputs);
    assert_eq!(
        page,
        fs::read_to_string(dir.path().join("_site/2022/01/01/x/index.html"))?
    );
    Ok(())
}

#[test]
fn test_check_does_not_write() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fixture(dir.path())?;
    write(dir.path(), "gallery.md", "---\nlayout: gallery\n---\n")?;
    let project = Project::find(dir.path())?;

    let build = build_site(&project, Mode::Check)?;
    assert!(!dir.path().join("_site").exists());
    assert_eq!(1, build.report.failures.len());
    assert_eq!(FailureKind::UnknownLayout, build.report.failures[0].kind);
    assert!(build
        .report
        .routes
        .iter()
        .any(|(route, owner)| route == "/about/" && owner == "about.md"));
    Ok(())
}
