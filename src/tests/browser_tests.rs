//! 浏览器目标的脚手架测试
//! 在 QuickJS 中按顺序执行浏览器文档的经典脚本：静态链接表宿主、postMessage 上报、就绪门

use super::project;
use crate::config::PreviewConfig;
use crate::externals::ExternalLib;
use crate::registry::compile;
use crate::sandbox::runtime::JsRuntime;
use crate::scaffold::{ScaffoldBuilder, Target};
use crate::Project;
use serde_json::Value;

/// 最小的 window/document、手动推进的定时器，以及渲染成字符串的 React 桩
const PAGE_STUB: &str = r#"
var window = globalThis;
var timers = [];
var now = 0;
var seq = 0;
var console = {
  errors: [],
  error: function (m) { console.errors.push(String(m)); },
  log: function () {},
  warn: function () {}
};
window.setTimeout = function (fn, ms) { timers.push({ at: now + (ms || 0), id: seq++, fn: fn }); return seq; };
window.addEventListener = function () {};
window.parent = { messages: [], postMessage: function (m) { this.messages.push(m); } };
var document = {
  readyState: 'complete',
  root: { innerHTML: '' },
  getElementById: function (id) { return id === 'root' ? this.root : null; },
  addEventListener: function () {}
};
window.document = document;

function __flushTimers() {
  var n = 0;
  while (timers.length && n < 1000) {
    timers.sort(function (a, b) { return a.at - b.at || a.id - b.id; });
    var t = timers.shift();
    now = t.at;
    t.fn();
    n++;
  }
}

var React = (function () {
  function createElement(type, props) {
    return { type: type, props: props || {}, children: Array.prototype.slice.call(arguments, 2) };
  }
  function Component(props) { this.props = props; }
  function escape(text) {
    return String(text).replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
  }
  function render(node) {
    if (node === null || node === undefined || node === false || node === true) return '';
    if (Array.isArray(node)) return node.map(render).join('');
    if (typeof node !== 'object') return escape(node);
    var kids = node.children;
    var props = Object.assign({}, node.props, { children: kids.length === 1 ? kids[0] : kids });
    var type = node.type;
    if (typeof type === 'function') {
      if (type.prototype && type.prototype.render) {
        var inst = new type(props);
        try {
          return render(inst.render());
        } catch (e) {
          if (!type.getDerivedStateFromError) throw e;
          inst.state = type.getDerivedStateFromError(e);
          inst.componentDidCatch(e);
          return render(inst.render());
        }
      }
      return render(type(props));
    }
    var attrs = '';
    Object.keys(node.props).forEach(function (k) {
      var v = node.props[k];
      if (typeof v === 'string') attrs += ' ' + (k === 'className' ? 'class' : k) + '="' + escape(v) + '"';
    });
    var inner = node.props.dangerouslySetInnerHTML ? node.props.dangerouslySetInnerHTML.__html : render(kids);
    return '<' + type + attrs + '>' + inner + '</' + type + '>';
  }
  return { createElement: createElement, Component: Component, Fragment: 'fragment', render: render };
})();

var ReactDOM = {
  createRoot: function (el) {
    return {
      render: function (tree) { el.innerHTML = React.render(tree); },
      unmount: function () { el.innerHTML = ''; }
    };
  }
};
"#;

struct Page {
    rt: JsRuntime,
}

impl Page {
    /// 编译快照，生成浏览器脚手架并执行其中的经典脚本；`withheld` 中的外部库永远不到达
    fn open(p: &Project, config: &PreviewConfig, withheld: &[ExternalLib]) -> Page {
        let result = compile(p, config);
        let scaffold = ScaffoldBuilder::new(config, Target::Browser).result(&result).build();

        let rt = JsRuntime::new().unwrap();
        rt.eval_named("page-stub", PAGE_STUB).unwrap();
        let mut bindings = String::from("window.__PREVIEW_BINDINGS__ = {};\n");
        for lib in ExternalLib::ALL.iter().filter(|lib| !withheld.contains(lib)) {
            let value = match lib {
                ExternalLib::React => "React",
                ExternalLib::ReactDom | ExternalLib::ReactDomClient => "ReactDOM",
                ExternalLib::Clsx => "{ clsx: function () { return Array.prototype.join.call(arguments, ' '); } }",
                _ => "{}",
            };
            bindings.push_str(&format!(
                "window.__PREVIEW_BINDINGS__[{}] = {};\n",
                Value::from(lib.specifier()),
                value
            ));
        }
        rt.eval_named("bindings", &bindings).unwrap();

        for (name, source) in scaffold.scripts() {
            rt.eval_named(name, source).unwrap();
        }
        rt.eval("__flushTimers()").unwrap();
        rt.run_jobs().unwrap();
        Page { rt }
    }

    fn root_html(&self) -> String {
        self.rt.eval("document.root.innerHTML").unwrap()
    }

    fn messages(&self) -> Vec<Value> {
        let json = self.rt.eval("JSON.stringify(window.parent.messages)").unwrap();
        serde_json::from_str(&json).unwrap()
    }

    fn eval_json(&self, expr: &str) -> Value {
        let json = self.rt.eval(&format!("JSON.stringify({})", expr)).unwrap();
        serde_json::from_str(&json).unwrap()
    }
}

#[test]
fn test_browser_page_mounts_entry() {
    let p = project(&[(
        "App.tsx",
        "export default function App() { return <main><h1 className=\"text-xl\">Hi</h1></main>; }",
    )]);
    let page = Page::open(&p, &PreviewConfig::default(), &[]);
    assert_eq!(page.root_html(), "<main><h1 class=\"text-xl\">Hi</h1></main>");
    assert!(page.messages().is_empty());
    assert_eq!(page.eval_json("window.__preview.state.failed"), Value::Bool(false));
}

#[test]
fn test_browser_page_links_modules_through_static_table() {
    let p = project(&[
        (
            "App.tsx",
            "import { Badge } from './components/Badge';\nexport default function App() { return <div><Badge /><Badge /></div>; }",
        ),
        (
            "components/Badge.tsx",
            "import { clsx } from 'clsx';\nimport { tag } from '../lib/tag';\nexport function Badge() { return <b className={clsx('a', 'b')}>{tag}</b>; }",
        ),
        ("lib/tag.ts", "(globalThis as any).__tagRuns = ((globalThis as any).__tagRuns || 0) + 1;\nexport const tag: string = 'ok';"),
    ]);
    let page = Page::open(&p, &PreviewConfig::default(), &[]);
    assert_eq!(page.root_html(), "<div><b class=\"a b\">ok</b><b class=\"a b\">ok</b></div>");
    assert_eq!(page.eval_json("globalThis.__tagRuns"), Value::from(1));
}

#[test]
fn test_static_host_states_and_unknown_specifiers() {
    let page = Page::open(&project(&[("App.tsx", "export default () => null;")]), &PreviewConfig::default(), &[]);
    let result = page.eval_json(
        "(function () {
            var host = window.__preview.staticHost({ App: { './x': { module: 'x' }, react: { external: 'react' } } });
            return [
              host.resolve('./x', 'App'),
              host.resolve('react', 'App'),
              host.resolve('./nope', 'App').error,
              host.begin('x'), host.begin('x'),
              (host.fail('y'), host.begin('y'))
            ];
          })()",
    );
    assert_eq!(result[0]["module"], "x");
    assert_eq!(result[1]["external"], "react");
    assert_eq!(result[2], "Cannot find module './nope' (requested from App)");
    assert_eq!(result[3], "execute");
    assert_eq!(result[4], "ready");
    assert_eq!(result[5], "failed");
}

#[test]
fn test_browser_page_reports_unresolved_module() {
    let p = project(&[(
        "App.tsx",
        "import Missing from './Missing';\nexport default function App() { return <Missing />; }",
    )]);
    let page = Page::open(&p, &PreviewConfig::default(), &[]);
    let html = page.root_html();
    assert!(html.contains("data-kind=\"unresolved-module\""), "{}", html);
    assert!(html.contains("Module Not Found"));
    assert!(html.contains("./Missing"));

    let messages = page.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["type"], "preview-error");
    assert_eq!(messages[0]["kind"], "unresolved-module");
    assert_eq!(messages[0]["terminal"], true);
}

#[test]
fn test_browser_page_reports_transform_error() {
    let p = project(&[("App.tsx", "export default function App() {\n  return <div><span>hi</div>;\n}")]);
    let page = Page::open(&p, &PreviewConfig::default(), &[]);
    let html = page.root_html();
    assert!(html.contains("Transform Error"), "{}", html);
    assert!(html.contains("App.tsx:2:"));
    assert_eq!(page.messages()[0]["kind"], "transform");
}

#[test]
fn test_browser_boundary_replaces_mount_with_panel() {
    let p = project(&[(
        "App.tsx",
        "function Broken(): never { throw new Error('boom'); }\nexport default function App() { return <div><Broken /></div>; }",
    )]);
    let page = Page::open(&p, &PreviewConfig::default(), &[]);
    let html = page.root_html();
    assert!(html.starts_with("<div class=\"preview-error\""), "{}", html);
    assert!(html.contains("Runtime Error"));
    assert!(html.contains("boom"));
    let messages = page.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["kind"], "runtime");
    assert_eq!(messages[0]["message"], "boom");
}

#[test]
fn test_browser_readiness_timeout() {
    let config = PreviewConfig::from_json(r#"{"readiness": {"maxAttempts": 3}}"#).unwrap();
    let p = project(&[("App.tsx", "export default function App() { return <p>never</p>; }")]);
    let page = Page::open(&p, &config, &[ExternalLib::Clsx]);
    let html = page.root_html();
    assert!(html.contains("Preview Timed Out"), "{}", html);
    assert!(html.contains("after 3 attempts: clsx"));
    assert_eq!(page.messages()[0]["kind"], "readiness-timeout");
    assert!(page.eval_json("console.errors")[0]
        .as_str()
        .unwrap()
        .starts_with("[preview] readiness-timeout"));
}
