use swc_common::errors::{ColorConfig, Handler};
use swc_common::{sync::Lrc, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast as ast;
use swc_ecma_parser::{EsConfig, Parser, StringInput, Syntax};

use crate::error::{ExtractError, Result};
use crate::node::{kinds, Location, Node, Scalar};

/// Parse JavaScript source into the node model. Sources are read as
/// scripts first (CommonJS route and error modules), then as ES modules.
/// When both fail, the script error is emitted to stderr and returned.
pub fn parse_source(source: &str, path: &str) -> Result<Node> {
    let cm: Lrc<SourceMap> = Default::default();
    let handler = Handler::with_tty_emitter(ColorConfig::Auto, true, false, Some(cm.clone()));
    let fm = cm.new_source_file(FileName::Custom(path.to_string()).into(), source.into());
    let lowering = Lowering { cm: cm.clone() };

    let script_err = match Parser::new(Syntax::Es(EsConfig::default()), StringInput::from(&*fm), None).parse_script() {
        Ok(script) => return Ok(lowering.script(&script)),
        Err(err) => err,
    };

    match Parser::new(Syntax::Es(EsConfig::default()), StringInput::from(&*fm), None).parse_module() {
        Ok(module) => Ok(lowering.module(&module)),
        Err(_) => {
            let line = lowering.loc(script_err.span()).line;
            let message = script_err.kind().msg().to_string();
            script_err.into_diagnostic(&handler).emit();
            Err(ExtractError::Parse { path: path.to_string(), line: Some(line), message })
        }
    }
}

/// Converts swc's typed AST into ESTree-shaped [`Node`]s.
struct Lowering {
    cm: Lrc<SourceMap>,
}

impl Lowering {
    /// 1-based line and 0-based character column of the span start.
    fn loc(&self, span: Span) -> Location {
        let loc = self.cm.lookup_char_pos(span.lo);
        Location { line: loc.line, column: loc.col.0 }
    }

    fn script(&self, script: &ast::Script) -> Node {
        Node::new(kinds::PROGRAM, self.loc(script.span))
            .with("body", self.stmts(&script.body))
            .with("sourceType", "script")
    }

    fn module(&self, module: &ast::Module) -> Node {
        let body: Vec<Node> = module
            .body
            .iter()
            .map(|item| match item {
                ast::ModuleItem::Stmt(stmt) => self.stmt(stmt),
                ast::ModuleItem::ModuleDecl(decl) => Node::new("ModuleDeclaration", self.loc(decl.span())),
            })
            .collect();
        Node::new(kinds::PROGRAM, self.loc(module.span))
            .with("body", body)
            .with("sourceType", "module")
    }

    fn stmts(&self, stmts: &[ast::Stmt]) -> Vec<Node> {
        stmts.iter().map(|stmt| self.stmt(stmt)).collect()
    }

    fn block(&self, block: &ast::BlockStmt) -> Node {
        Node::new(kinds::BLOCK, self.loc(block.span)).with("body", self.stmts(&block.stmts))
    }

    fn opt_expr(&self, expr: Option<&ast::Expr>) -> Option<Node> {
        expr.map(|expr| self.expr(expr))
    }

    fn stmt(&self, stmt: &ast::Stmt) -> Node {
        use ast::Stmt;
        let at = self.loc(stmt.span());
        match stmt {
            Stmt::Block(block) => self.block(block),
            Stmt::Expr(s) => Node::new("ExpressionStatement", at).with("expression", self.expr(&s.expr)),
            Stmt::Return(s) => Node::new(kinds::RETURN, at).with("argument", self.opt_expr(s.arg.as_deref())),
            Stmt::Decl(decl) => self.decl(decl, at),
            Stmt::If(s) => Node::new("IfStatement", at)
                .with("test", self.expr(&s.test))
                .with("consequent", self.stmt(&s.cons))
                .with("alternate", s.alt.as_deref().map(|alt| self.stmt(alt))),
            Stmt::Switch(s) => {
                let cases: Vec<Node> = s
                    .cases
                    .iter()
                    .map(|case| {
                        Node::new("SwitchCase", self.loc(case.span))
                            .with("test", self.opt_expr(case.test.as_deref()))
                            .with("consequent", self.stmts(&case.cons))
                    })
                    .collect();
                Node::new("SwitchStatement", at)
                    .with("discriminant", self.expr(&s.discriminant))
                    .with("cases", cases)
            }
            Stmt::Throw(s) => Node::new("ThrowStatement", at).with("argument", self.expr(&s.arg)),
            Stmt::Try(s) => {
                let handler = s.handler.as_ref().map(|handler| {
                    Node::new("CatchClause", self.loc(handler.span))
                        .with("param", handler.param.as_ref().map(|param| self.pat(param)))
                        .with("body", self.block(&handler.body))
                });
                Node::new("TryStatement", at)
                    .with("block", self.block(&s.block))
                    .with("handler", handler)
                    .with("finalizer", s.finalizer.as_ref().map(|block| self.block(block)))
            }
            Stmt::While(s) => Node::new("WhileStatement", at)
                .with("test", self.expr(&s.test))
                .with("body", self.stmt(&s.body)),
            Stmt::DoWhile(s) => Node::new("DoWhileStatement", at)
                .with("body", self.stmt(&s.body))
                .with("test", self.expr(&s.test)),
            Stmt::For(s) => {
                let init = s.init.as_ref().map(|init| match init {
                    ast::VarDeclOrExpr::VarDecl(var) => self.var_decl(var),
                    ast::VarDeclOrExpr::Expr(expr) => self.expr(expr),
                });
                Node::new("ForStatement", at)
                    .with("init", init)
                    .with("test", self.opt_expr(s.test.as_deref()))
                    .with("update", self.opt_expr(s.update.as_deref()))
                    .with("body", self.stmt(&s.body))
            }
            Stmt::ForIn(s) => Node::new("ForInStatement", at)
                .with("right", self.expr(&s.right))
                .with("body", self.stmt(&s.body)),
            Stmt::ForOf(s) => Node::new("ForOfStatement", at)
                .with("right", self.expr(&s.right))
                .with("body", self.stmt(&s.body)),
            Stmt::Labeled(s) => Node::new("LabeledStatement", at)
                .with("label", self.ident(&s.label))
                .with("body", self.stmt(&s.body)),
            Stmt::Empty(_) => Node::new("EmptyStatement", at),
            Stmt::Break(_) => Node::new("BreakStatement", at),
            Stmt::Continue(_) => Node::new("ContinueStatement", at),
            _ => Node::new("Statement", at),
        }
    }

    fn decl(&self, decl: &ast::Decl, at: Location) -> Node {
        match decl {
            ast::Decl::Var(var) => self.var_decl(var),
            ast::Decl::Fn(f) => self.function("FunctionDeclaration", at, Some(&f.ident), &f.function),
            ast::Decl::Class(c) => Node::new("ClassDeclaration", at).with("id", self.ident(&c.ident)),
            _ => Node::new("Declaration", at),
        }
    }

    fn var_decl(&self, var: &ast::VarDecl) -> Node {
        let declarations: Vec<Node> = var
            .decls
            .iter()
            .map(|declarator| {
                Node::new(kinds::VARIABLE_DECLARATOR, self.loc(declarator.span))
                    .with("id", self.pat(&declarator.name))
                    .with("init", self.opt_expr(declarator.init.as_deref()))
            })
            .collect();
        Node::new(kinds::VARIABLE_DECLARATION, self.loc(var.span))
            .with("declarations", declarations)
            .with("kind", var.kind.as_str())
    }

    fn function(&self, kind: &str, at: Location, id: Option<&ast::Ident>, function: &ast::Function) -> Node {
        let params: Vec<Node> = function.params.iter().map(|param| self.pat(&param.pat)).collect();
        Node::new(kind, at)
            .with("id", id.map(|id| self.ident(id)))
            .with("params", params)
            .with("body", function.body.as_ref().map(|body| self.block(body)))
    }

    fn ident(&self, id: &ast::Ident) -> Node {
        Node::new(kinds::IDENTIFIER, self.loc(id.span)).with("name", id.sym.to_string())
    }

    // member properties and property keys
    fn ident_name(&self, id: &ast::IdentName) -> Node {
        Node::new(kinds::IDENTIFIER, self.loc(id.span)).with("name", id.sym.to_string())
    }

    fn pat(&self, pat: &ast::Pat) -> Node {
        let at = self.loc(pat.span());
        match pat {
            ast::Pat::Ident(binding) => self.ident(&binding.id),
            ast::Pat::Expr(expr) => self.expr(expr),
            ast::Pat::Object(_) => Node::new("ObjectPattern", at),
            ast::Pat::Array(_) => Node::new("ArrayPattern", at),
            ast::Pat::Rest(_) => Node::new("RestElement", at),
            ast::Pat::Assign(_) => Node::new("AssignmentPattern", at),
            _ => Node::new("Pattern", at),
        }
    }

    fn expr(&self, expr: &ast::Expr) -> Node {
        use ast::Expr;
        let at = self.loc(expr.span());
        match expr {
            Expr::Lit(lit) => self.lit(lit, at),
            Expr::Ident(id) => self.ident(id),
            Expr::This(_) => Node::new("ThisExpression", at),
            Expr::Array(array) => {
                let elements: Vec<Node> =
                    array.elems.iter().flatten().map(|element| self.expr_or_spread(element)).collect();
                Node::new(kinds::ARRAY, at).with("elements", elements)
            }
            Expr::Object(object) => {
                let properties: Vec<Node> = object.props.iter().map(|prop| self.prop_or_spread(prop)).collect();
                Node::new(kinds::OBJECT, at).with("properties", properties)
            }
            Expr::Fn(f) => self.function(kinds::FUNCTION, at, f.ident.as_ref(), &f.function),
            Expr::Arrow(arrow) => {
                let params: Vec<Node> = arrow.params.iter().map(|param| self.pat(param)).collect();
                let (body, expression) = match &*arrow.body {
                    ast::BlockStmtOrExpr::BlockStmt(block) => (self.block(block), false),
                    ast::BlockStmtOrExpr::Expr(expr) => (self.expr(expr), true),
                };
                Node::new(kinds::ARROW_FUNCTION, at)
                    .with("params", params)
                    .with("body", body)
                    .with("expression", expression)
            }
            Expr::Unary(unary) => Node::new("UnaryExpression", at)
                .with("operator", unary.op.as_str())
                .with("argument", self.expr(&unary.arg)),
            Expr::Update(update) => Node::new("UpdateExpression", at).with("argument", self.expr(&update.arg)),
            Expr::Bin(bin) => {
                let kind = match bin.op {
                    ast::BinaryOp::LogicalOr | ast::BinaryOp::LogicalAnd | ast::BinaryOp::NullishCoalescing => {
                        kinds::LOGICAL
                    }
                    _ => kinds::BINARY,
                };
                Node::new(kind, at)
                    .with("operator", bin.op.as_str())
                    .with("left", self.expr(&bin.left))
                    .with("right", self.expr(&bin.right))
            }
            Expr::Assign(assign) => Node::new(kinds::ASSIGNMENT, at)
                .with("operator", assign.op.as_str())
                .with("left", self.assign_target(&assign.left, at))
                .with("right", self.expr(&assign.right)),
            Expr::Member(member) => self.member(member, at),
            Expr::Cond(cond) => Node::new("ConditionalExpression", at)
                .with("test", self.expr(&cond.test))
                .with("consequent", self.expr(&cond.cons))
                .with("alternate", self.expr(&cond.alt)),
            Expr::Call(call) => {
                let callee = match &call.callee {
                    ast::Callee::Expr(callee) => self.expr(callee),
                    ast::Callee::Super(sup) => Node::new("Super", self.loc(sup.span)),
                    ast::Callee::Import(import) => Node::new("Import", self.loc(import.span)),
                };
                Node::new(kinds::CALL, at).with("callee", callee).with("arguments", self.arguments(&call.args))
            }
            Expr::New(new) => Node::new(kinds::NEW, at)
                .with("callee", self.expr(&new.callee))
                .with("arguments", self.arguments(new.args.as_deref().unwrap_or(&[]))),
            Expr::Seq(seq) => {
                let expressions: Vec<Node> = seq.exprs.iter().map(|expr| self.expr(expr)).collect();
                Node::new("SequenceExpression", at).with("expressions", expressions)
            }
            // ESTree has no parenthesised expression node
            Expr::Paren(paren) => self.expr(&paren.expr),
            Expr::Tpl(tpl) => {
                let expressions: Vec<Node> = tpl.exprs.iter().map(|expr| self.expr(expr)).collect();
                Node::new("TemplateLiteral", at).with("expressions", expressions)
            }
            Expr::Await(await_expr) => Node::new("AwaitExpression", at).with("argument", self.expr(&await_expr.arg)),
            Expr::Yield(yield_expr) => {
                Node::new("YieldExpression", at).with("argument", self.opt_expr(yield_expr.arg.as_deref()))
            }
            Expr::Class(_) => Node::new("ClassExpression", at),
            _ => Node::new("Expression", at),
        }
    }

    fn arguments(&self, args: &[ast::ExprOrSpread]) -> Vec<Node> {
        args.iter().map(|arg| self.expr_or_spread(arg)).collect()
    }

    fn expr_or_spread(&self, element: &ast::ExprOrSpread) -> Node {
        match element.spread {
            Some(dots) => Node::new("SpreadElement", self.loc(dots)).with("argument", self.expr(&element.expr)),
            None => self.expr(&element.expr),
        }
    }

    fn member(&self, member: &ast::MemberExpr, at: Location) -> Node {
        let (property, computed) = match &member.prop {
            ast::MemberProp::Ident(id) => (self.ident_name(id), false),
            ast::MemberProp::PrivateName(private) => (Node::new("PrivateIdentifier", self.loc(private.span)), false),
            ast::MemberProp::Computed(computed) => (self.expr(&computed.expr), true),
        };
        Node::new(kinds::MEMBER, at)
            .with("object", self.expr(&member.obj))
            .with("property", property)
            .with("computed", computed)
    }

    fn assign_target(&self, target: &ast::AssignTarget, at: Location) -> Node {
        match target {
            ast::AssignTarget::Simple(ast::SimpleAssignTarget::Ident(binding)) => self.ident(&binding.id),
            ast::AssignTarget::Simple(ast::SimpleAssignTarget::Member(member)) => {
                self.member(member, self.loc(member.span))
            }
            ast::AssignTarget::Simple(ast::SimpleAssignTarget::Paren(paren)) => self.expr(&paren.expr),
            _ => Node::new("Pattern", at),
        }
    }

    fn prop_or_spread(&self, prop: &ast::PropOrSpread) -> Node {
        match prop {
            ast::PropOrSpread::Spread(spread) => {
                Node::new("SpreadElement", self.loc(spread.dot3_token)).with("argument", self.expr(&spread.expr))
            }
            ast::PropOrSpread::Prop(prop) => self.prop(prop),
        }
    }

    fn prop(&self, prop: &ast::Prop) -> Node {
        let at = self.loc(prop.span());
        let property = |key: Node, value: Node, kind: &str| {
            Node::new(kinds::PROPERTY, at).with("key", key).with("value", value).with("kind", kind)
        };
        match prop {
            ast::Prop::KeyValue(kv) => property(self.prop_name(&kv.key), self.expr(&kv.value), "init"),
            ast::Prop::Shorthand(id) => {
                property(self.ident(id), self.ident(id), "init").with("shorthand", true)
            }
            ast::Prop::Assign(assign) => property(self.ident(&assign.key), self.expr(&assign.value), "init"),
            ast::Prop::Method(method) => property(
                self.prop_name(&method.key),
                self.function(kinds::FUNCTION, at, None, &method.function),
                "init",
            )
            .with("method", true),
            ast::Prop::Getter(getter) => property(self.prop_name(&getter.key), Node::new(kinds::FUNCTION, at), "get"),
            ast::Prop::Setter(setter) => property(self.prop_name(&setter.key), Node::new(kinds::FUNCTION, at), "set"),
        }
    }

    fn prop_name(&self, name: &ast::PropName) -> Node {
        let at = self.loc(name.span());
        match name {
            ast::PropName::Ident(id) => self.ident_name(id),
            ast::PropName::Str(s) => Node::new(kinds::LITERAL, at).with("value", s.value.to_string()),
            ast::PropName::Num(n) => Node::new(kinds::LITERAL, at).with("value", n.value),
            ast::PropName::Computed(computed) => self.expr(&computed.expr),
            _ => Node::new(kinds::LITERAL, at),
        }
    }

    fn lit(&self, lit: &ast::Lit, at: Location) -> Node {
        let value = match lit {
            ast::Lit::Str(s) => Scalar::Str(s.value.to_string()),
            ast::Lit::Num(n) => Scalar::Num(n.value),
            ast::Lit::Bool(b) => Scalar::Bool(b.value),
            ast::Lit::Null(_) => Scalar::Null,
            ast::Lit::Regex(re) => Scalar::Str(format!("/{}/{}", re.exp, re.flags)),
            _ => return Node::new(kinds::LITERAL, at),
        };
        Node::new(kinds::LITERAL, at).with("value", value)
    }
}
